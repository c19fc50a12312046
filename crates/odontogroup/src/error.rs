//! Tipos de erro para o crate odontogroup

use serde_json::Value;
use thiserror::Error;

/// Mensagem devolvida pela APIv3 quando o CNPJ já possui departamento
pub const MSG_DEPARTAMENTO_EXISTENTE: &str = "Já existe um Departamento cadastrado com esse CNPJ";

/// Erros do cliente Odontogroup
#[derive(Debug, Error)]
pub enum OdontogroupError {
    /// Erro de requisição HTTP (conexão, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API (status code não-2xx)
    #[error("Odontogroup API error (status {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        body: Value,
    },

    /// Token recusado (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Erro de validação de entrada
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl OdontogroupError {
    /// Status HTTP associado ao erro, quando houver resposta
    pub fn status(&self) -> Option<u16> {
        match self {
            OdontogroupError::ApiError { status, .. } => Some(*status),
            OdontogroupError::Unauthorized(_) => Some(401),
            OdontogroupError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Corpo devolvido pela API, quando houver
    pub fn body(&self) -> Option<&Value> {
        match self {
            OdontogroupError::ApiError { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// POST /departamento recusado porque o CNPJ já está cadastrado
    pub fn is_departamento_ja_existente(&self) -> bool {
        match self {
            OdontogroupError::ApiError {
                status: 400,
                message,
                ..
            } => message.contains(MSG_DEPARTAMENTO_EXISTENTE),
            _ => false,
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, OdontogroupError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_departamento_ja_existente_only_on_400() {
        let err = OdontogroupError::ApiError {
            status: 400,
            message: format!("[{{\"Erro\":\"{}.\"}}]", MSG_DEPARTAMENTO_EXISTENTE),
            body: json!([]),
        };
        assert!(err.is_departamento_ja_existente());

        let err = OdontogroupError::ApiError {
            status: 500,
            message: MSG_DEPARTAMENTO_EXISTENTE.to_string(),
            body: Value::Null,
        };
        assert!(!err.is_departamento_ja_existente());
    }

    #[test]
    fn test_unauthorized_status() {
        let err = OdontogroupError::Unauthorized("expired".to_string());
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert!(!OdontogroupError::ConfigError("x".to_string()).is_unauthorized());
    }
}
