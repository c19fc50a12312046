//! Login na APIv3

use crate::client::{handle_response, read_body, OdontogroupClient};
use crate::error::{OdontogroupError, Result};
use crate::types::LoginResponse;
use serde_json::Value;

impl OdontogroupClient {
    /// `GET /login?user=&password=`
    ///
    /// A API pode devolver `{ "token": ... }`, `{ "Token": ... }` ou o token cru.
    pub async fn login(&self, user: &str, password: &str) -> Result<LoginResponse> {
        if user.is_empty() || password.is_empty() {
            return Err(OdontogroupError::ConfigError(
                "ODONTO_USER / ODONTO_PASS não configurados".to_string(),
            ));
        }

        let url = self.url("login");
        tracing::info!("🔑 Login APIv3 em {} (user={})", url, user);

        let response = self
            .http()
            .get(&url)
            .query(&[("user", user), ("password", password)])
            .send()
            .await?;
        let response = handle_response(response).await?;
        let status = response.status().as_u16();
        let body = read_body(response).await;

        let token = match &body {
            Value::String(s) => Some(s.clone()),
            _ => ["token", "Token"]
                .iter()
                .find_map(|k| body.get(*k).and_then(|v| v.as_str()).map(str::to_string)),
        }
        .filter(|t| !t.trim().is_empty());

        let Some(token) = token else {
            return Err(OdontogroupError::ApiError {
                status,
                message: "Resposta de login sem token".to_string(),
                body,
            });
        };

        let expires_in = body
            .get("expiresIn")
            .or_else(|| body.get("expires_in"))
            .cloned()
            .filter(|v| !v.is_null());

        Ok(LoginResponse { token, expires_in })
    }
}
