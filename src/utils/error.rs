use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use odontogroup::OdontogroupError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    OdontogroupApi(OdontogroupError),
    DatabaseError(String),
    ConfigError(String),
    JsonError(serde_json::Error),
    HttpError(reqwest::Error),
    IoError(std::io::Error),
    ValidationError(String),
    NotFound(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::OdontogroupApi(err) => write!(f, "Odontogroup API error: {}", err),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::JsonError(err) => write!(f, "JSON error: {}", err),
            AppError::HttpError(err) => write!(f, "HTTP error: {}", err),
            AppError::IoError(err) => write!(f, "IO error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// 401 da APIv3 (dispara o retry com token novo)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::OdontogroupApi(e) if e.is_unauthorized())
    }

    /// Status HTTP devolvido pelo parceiro, quando o erro veio de uma resposta
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AppError::OdontogroupApi(e) => e.status(),
            AppError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err)
    }
}

impl From<OdontogroupError> for AppError {
    fn from(err: OdontogroupError) -> Self {
        AppError::OdontogroupApi(err)
    }
}

impl From<oracle::Error> for AppError {
    fn from(err: oracle::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::OdontogroupApi(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            AppError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::JsonError(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::HttpError(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            AppError::IoError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = json!({
            "message": error_message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
