//! Consulta de CEP na S4E (ids de logradouro, bairro, município e UF)

use crate::client::{read_body, value_as_i64, OdontogroupClient};
use crate::error::{OdontogroupError, Result};
use crate::types::EnderecoCep;
use serde_json::Value;

/// O mesmo recurso aparece com as duas grafias dependendo do ambiente
const CAMINHOS_CEP: [&str; 2] = ["api/redeatendimento/Endereco", "api/redeAtendimento/Endereco"];

/// `dados` só vale quando `codigo == 1`
pub fn parse_resposta_cep(body: &Value) -> Option<EnderecoCep> {
    if body.get("codigo").and_then(value_as_i64) != Some(1) {
        return None;
    }
    let dados = body.get("dados").filter(|d| d.is_object())?;
    serde_json::from_value(dados.clone()).ok()
}

impl OdontogroupClient {
    /// `POST {s4e}/api/redeatendimento/Endereco?token=&cep=`
    ///
    /// `Ok(None)` quando o CEP não é conhecido pela S4E.
    pub async fn buscar_cep(&self, cep: &str) -> Result<Option<EnderecoCep>> {
        let cep: String = cep.chars().filter(|c| c.is_ascii_digit()).collect();
        if cep.is_empty() {
            return Err(OdontogroupError::ValidationError("CEP vazio ou inválido".to_string()));
        }
        let token = self.s4e_token()?;

        for caminho in CAMINHOS_CEP {
            let url = self.s4e_url(caminho);
            tracing::debug!("Buscando CEP {} em {}", cep, url);

            let response = self
                .http()
                .post(&url)
                .query(&[("token", token), ("cep", cep.as_str())])
                .send()
                .await?;
            let status = response.status().as_u16();

            if status != 200 {
                tracing::warn!("CEP {}: {} respondeu {}", cep, caminho, status);
                continue;
            }

            let body = read_body(response).await;
            let endereco = parse_resposta_cep(&body);
            if endereco.is_none() {
                tracing::warn!("CEP {}: resposta inesperada {}", cep, body);
            }
            return Ok(endereco);
        }

        Ok(None)
    }
}
