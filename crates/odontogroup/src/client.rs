//! Cliente HTTP para a API Odontogroup (APIv3) e para a S4E

use crate::error::{OdontogroupError, Result};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Código da empresa (contrato) usado nas consultas de departamento
pub const EMPRESA_PADRAO: &str = "27552";

/// Base padrão da S4E
pub const S4E_BASE_PADRAO: &str = "https://odontogroup.s4e.com.br";

/// Resposta "crua" de um endpoint de envio: status e corpo, sucesso ou não.
///
/// Os endpoints de inclusão devolvem o motivo da recusa no corpo
/// (`resultMessage`, `mensagem`), então 4xx/5xx não viram erro aqui.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `resultMessage` da APIv3 (vazio quando ausente)
    pub fn result_message(&self) -> &str {
        self.body
            .get("resultMessage")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    pub fn result_code(&self) -> Option<i64> {
        self.body.get("resultCode").and_then(value_as_i64)
    }

    /// Mensagem para auditoria: resultMessage → mensagem → message → corpo
    pub fn mensagem(&self) -> String {
        ["resultMessage", "mensagem", "message"]
            .iter()
            .filter_map(|k| self.body.get(*k).and_then(|v| v.as_str()))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string())
    }
}

/// Cliente para interagir com a API Odontogroup
#[derive(Clone)]
pub struct OdontogroupClient {
    http_client: HttpClient,
    base_url: String,
    s4e_base_url: String,
    s4e_token: Option<String>,
    empresa: String,
}

impl OdontogroupClient {
    /// Cria um novo cliente
    ///
    /// # Argumentos
    ///
    /// * `base_url` - Base da APIv3 (ex: `https://apiv3.odontogroup.com.br/api`)
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(base_url, 30, 5)
    }

    /// Cria um novo cliente com timeouts customizados
    pub fn with_timeouts(
        base_url: impl Into<String>,
        total_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(OdontogroupError::ConfigError(
                "ODONTO_BASE_APIV3 não configurado".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| OdontogroupError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: trim_base(&base_url),
            s4e_base_url: S4E_BASE_PADRAO.to_string(),
            s4e_token: None,
            empresa: EMPRESA_PADRAO.to_string(),
        })
    }

    /// Configura a base e o token fixo da S4E (CEP, NovoDependente, AssociadoPJ)
    pub fn with_s4e(mut self, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base = base_url.into();
        if !base.trim().is_empty() {
            self.s4e_base_url = trim_base(&base);
        }
        self.s4e_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Configura o código de empresa usado em /departamento
    pub fn with_empresa(mut self, empresa: impl Into<String>) -> Self {
        self.empresa = empresa.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn s4e_base_url(&self) -> &str {
        &self.s4e_base_url
    }

    pub fn empresa(&self) -> &str {
        &self.empresa
    }

    pub(crate) fn s4e_token(&self) -> Result<&str> {
        self.s4e_token
            .as_deref()
            .ok_or_else(|| OdontogroupError::ConfigError("ODONTO_S4E_TOKEN não configurado".to_string()))
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub(crate) fn s4e_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.s4e_base_url, endpoint.trim_start_matches('/'))
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http_client
    }

    /// GET autenticado (Bearer) com query string
    pub(crate) async fn get_json<T, Q>(&self, endpoint: &str, token: &str, query: &Q) -> Result<(u16, T)>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);

        let request = self.http_client.get(&url).query(query);
        let response = bearer(request, token).send().await?;
        let response = handle_response(response).await?;
        let status = response.status().as_u16();
        let json = serde_json::from_value(read_body(response).await)?;
        Ok((status, json))
    }

    /// POST autenticado (Bearer) com corpo JSON
    pub(crate) async fn post_json<T, B>(&self, endpoint: &str, token: &str, body: &B) -> Result<(u16, T)>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        tracing::debug!(
            "POST {} with body: {}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );

        let request = self.http_client.post(&url).json(body);
        let response = bearer(request, token).send().await?;
        let response = handle_response(response).await?;
        let status = response.status().as_u16();
        let json = serde_json::from_value(read_body(response).await)?;
        Ok((status, json))
    }
}

fn trim_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    request
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
}

/// Lê o corpo como JSON; corpo vazio vira `{}`, texto não-JSON vira string
pub(crate) async fn read_body(response: Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Processa a resposta HTTP e trata erros
pub(crate) async fn handle_response(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let body = read_body(response).await;
    let message = mensagem_erro(&body);

    tracing::error!("Odontogroup API error ({}): {}", status_code, message);

    if status_code == 401 {
        return Err(OdontogroupError::Unauthorized(message));
    }

    Err(OdontogroupError::ApiError {
        status: status_code,
        message,
        body,
    })
}

/// Captura status e corpo; apenas 401 vira erro (para o retry de token)
pub(crate) async fn capture_response(response: Response) -> Result<ApiResponse> {
    let status = response.status().as_u16();
    let body = read_body(response).await;

    if status == 401 {
        return Err(OdontogroupError::Unauthorized(mensagem_erro(&body)));
    }

    Ok(ApiResponse { status, body })
}

/// Extrai a mensagem de erro do corpo.
///
/// A APIv3 responde erros de validação como array (`[{"Erro": "..."}]`),
/// por isso arrays são serializados inteiros.
pub fn mensagem_erro(body: &Value) -> String {
    match body {
        Value::Array(_) => body.to_string(),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => ["Erro", "error", "message"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(|v| v.as_str()))
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
    }
}

/// Número que pode vir como JSON number ou string numérica
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = OdontogroupClient::new("https://apiv3.odontogroup.com.br/api/").unwrap();
        assert_eq!(client.base_url(), "https://apiv3.odontogroup.com.br/api");
        assert_eq!(client.s4e_base_url(), S4E_BASE_PADRAO);
        assert_eq!(client.empresa(), EMPRESA_PADRAO);
        assert_eq!(client.url("/departamento"), "https://apiv3.odontogroup.com.br/api/departamento");
    }

    #[test]
    fn test_client_requires_base_url() {
        assert!(matches!(
            OdontogroupClient::new("  "),
            Err(OdontogroupError::ConfigError(_))
        ));
    }

    #[test]
    fn test_s4e_token_blank_is_missing() {
        let client = OdontogroupClient::new("http://localhost")
            .unwrap()
            .with_s4e("http://s4e.local/", Some("  ".to_string()));
        assert!(client.s4e_token().is_err());
        assert_eq!(client.s4e_url("api/x"), "http://s4e.local/api/x");
    }

    #[test]
    fn test_mensagem_erro() {
        assert_eq!(mensagem_erro(&json!({"Erro": "CNPJ inválido"})), "CNPJ inválido");
        assert_eq!(mensagem_erro(&json!({"error": "boom"})), "boom");
        assert_eq!(mensagem_erro(&json!([{"Erro": "x"}])), "[{\"Erro\":\"x\"}]");
        assert_eq!(mensagem_erro(&json!({"outro": 1})), "{\"outro\":1}");
    }

    #[test]
    fn test_api_response_helpers() {
        let resp = ApiResponse {
            status: 200,
            body: json!({"resultCode": "3", "resultMessage": "Titular já cadastrado e ativo no contrato. "}),
        };
        assert!(resp.is_success());
        assert_eq!(resp.result_code(), Some(3));
        assert!(resp.result_message().contains("Titular já cadastrado"));
        assert_eq!(resp.mensagem(), "Titular já cadastrado e ativo no contrato. ");

        let resp = ApiResponse { status: 500, body: json!({"foo": "bar"}) };
        assert!(!resp.is_success());
        assert_eq!(resp.result_message(), "");
        assert_eq!(resp.mensagem(), "{\"foo\":\"bar\"}");
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(value_as_i64(&json!(12)), Some(12));
        assert_eq!(value_as_i64(&json!(" 34 ")), Some(34));
        assert_eq!(value_as_i64(&json!("abc")), None);
        assert_eq!(value_as_i64(&Value::Null), None);
    }
}
