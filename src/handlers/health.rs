use axum::response::Json;
use serde_json::{json, Value};

use crate::utils::logging::*;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "odontogroup-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn api_root() -> &'static str {
    "API funcionando!"
}
