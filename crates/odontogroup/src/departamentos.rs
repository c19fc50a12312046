//! Departamentos (empresas contratantes) na APIv3

use crate::client::OdontogroupClient;
use crate::error::{OdontogroupError, Result};
use crate::types::{DepartamentoPayload, DepartamentoRemoto};
use serde_json::Value;

impl OdontogroupClient {
    /// `GET /departamento?empresa={empresa}&cnpj={cnpj}`
    pub async fn buscar_departamento(&self, token: &str, cnpj: &str) -> Result<DepartamentoRemoto> {
        if cnpj.is_empty() {
            return Err(OdontogroupError::ValidationError("CNPJ é obrigatório".to_string()));
        }

        let query = [("empresa", self.empresa()), ("cnpj", cnpj)];
        let (status, body): (u16, Value) = self.get_json("departamento", token, &query).await?;
        Ok(DepartamentoRemoto::from_body(status, body))
    }

    /// `POST /departamento`
    ///
    /// Um 400 com "Já existe um Departamento cadastrado com esse CNPJ" volta
    /// como `ApiError`; use `is_departamento_ja_existente()` para tratar.
    pub async fn criar_departamento(
        &self,
        token: &str,
        payload: &DepartamentoPayload,
    ) -> Result<DepartamentoRemoto> {
        let (status, body): (u16, Value) = self.post_json("departamento", token, payload).await?;
        Ok(DepartamentoRemoto::from_body(status, body))
    }
}
