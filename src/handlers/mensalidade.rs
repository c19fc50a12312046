use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

/// `GET /api/mensalidade/:id`: mês (MMYYYY) da primeira mensalidade em aberto
pub async fn get_mensalidade(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    log_request_received("/api/mensalidade/:id", "GET");

    match state.store.primeira_mensalidade(id).await? {
        Some(mensalidade) => Ok(Json(json!({ "mensalidade": mensalidade }))),
        None => Err(AppError::NotFound("Mensalidades não encontradas.".to_string())),
    }
}
