// Handlers da API HTTP
pub mod beneficiario;
pub mod cep;
pub mod health;
pub mod mensalidade;

pub use beneficiario::*;
pub use cep::*;
pub use health::*;
pub use mensalidade::*;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Rotas públicas; `/api/incluir` é um alias das rotas de beneficiário
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api", get(api_root))
        .route("/api/", get(api_root))
        .route("/api/cep/:cep", get(consulta_cep))
        .route("/api/mensalidade/:id", get(get_mensalidade))
        .nest("/api/beneficiario", beneficiario::router())
        .nest("/api/incluir", beneficiario::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
