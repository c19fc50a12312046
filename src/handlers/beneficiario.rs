use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::BeneficiarioRow;
use crate::services::InclusaoService;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

const NAO_ENCONTRADO: &str = "Beneficiário não encontrado";

#[derive(Debug, Deserialize)]
pub struct IncluirRequest {
    pub id: i64,
}

/// Rotas montadas em `/api/beneficiario` e `/api/incluir`
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/titular/:id", get(get_titular))
        .route("/beneficiario/:id", get(get_beneficiario))
        .route("/incluir", post(incluir_beneficiario))
        .route("/incluirVariosBeneficiarios", post(incluir_varios_beneficiarios))
}

pub async fn get_titular(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<BeneficiarioRow>> {
    log_request_received("/api/beneficiario/titular/:id", "GET");

    state
        .store
        .buscar_titular(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NAO_ENCONTRADO.to_string()))
}

pub async fn get_beneficiario(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<BeneficiarioRow>> {
    log_request_received("/api/beneficiario/beneficiario/:id", "GET");

    state
        .store
        .buscar_beneficiario(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NAO_ENCONTRADO.to_string()))
}

/// Repassa status e corpo devolvidos pelo AssociadoPJ
pub async fn incluir_beneficiario(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IncluirRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let start_time = Instant::now();
    log_request_received("/api/beneficiario/incluir", "POST");

    let resposta = InclusaoService::new(state.as_ref().clone())
        .incluir_beneficiario(request.id)
        .await?;
    let status = StatusCode::from_u16(resposta.status).unwrap_or(StatusCode::BAD_GATEWAY);

    log_request_processed(
        "/api/beneficiario/incluir",
        status.as_u16(),
        start_time.elapsed().as_millis() as u64,
    );
    Ok((status, Json(resposta.body)))
}

pub async fn incluir_varios_beneficiarios(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/beneficiario/incluirVariosBeneficiarios", "POST");

    let resultados = InclusaoService::new(state.as_ref().clone()).incluir_varios().await?;

    log_request_processed(
        "/api/beneficiario/incluirVariosBeneficiarios",
        200,
        start_time.elapsed().as_millis() as u64,
    );
    Ok(Json(json!({
        "message": "Processamento concluído",
        "inclusaoResultados": resultados
    })))
}
