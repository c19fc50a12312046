use axum::extract::{Path, State};
use axum::response::Json;
use odontogroup::EnderecoCep;
use std::sync::Arc;

use crate::utils::logging::*;
use crate::utils::{only_digits, AppError, AppResult};
use crate::AppState;

/// `GET /api/cep/:cep` (consulta na S4E)
pub async fn consulta_cep(
    State(state): State<Arc<AppState>>,
    Path(cep): Path<String>,
) -> AppResult<Json<EnderecoCep>> {
    log_request_received("/api/cep/:cep", "GET");

    let cep = only_digits(&cep);
    if cep.len() != 8 {
        return Err(AppError::ValidationError("CEP inválido.".to_string()));
    }

    state
        .client()
        .buscar_cep(&cep)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("CEP não encontrado.".to_string()))
}
