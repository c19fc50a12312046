//! Verificação de CPFs em associado-Emp
//!
//! Cada vida ainda não `ENCONTRADO` é consultada uma vez por CPF e o
//! resultado vai para `odonto_associado_emp_chk`.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{CpfCheckLog, CpfCheckRow, StatusCpf};
use crate::utils::logging::*;
use crate::utils::{only_digits, AppError, AppResult};
use crate::AppState;

/// Resultado da consulta de um CPF (reaproveitado para CPFs repetidos)
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultaCpf {
    pub status: StatusCpf,
    pub http_status: Option<u16>,
    pub mensagem: String,
    pub corpo: Value,
}

impl ConsultaCpf {
    pub fn from_resultado(resultado: AppResult<Vec<Value>>) -> Self {
        match resultado {
            Ok(vidas) if vidas.is_empty() => Self {
                status: StatusCpf::NaoEncontrado,
                http_status: Some(200),
                mensagem: "Nenhum registro encontrado na API".to_string(),
                corpo: Value::Array(vidas),
            },
            Ok(vidas) => Self {
                status: StatusCpf::Encontrado,
                http_status: Some(200),
                mensagem: format!("Encontrado(s) {} registro(s) na API", vidas.len()),
                corpo: Value::Array(vidas),
            },
            Err(e) => Self {
                status: StatusCpf::Erro,
                http_status: e.http_status(),
                corpo: match &e {
                    AppError::OdontogroupApi(api) => api.body().cloned().unwrap_or_else(|| json!({})),
                    _ => json!({}),
                },
                mensagem: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumoCpf {
    pub total: usize,
    pub sem_cpf: usize,
    pub consultados: usize,
    pub reaproveitados: usize,
    pub encontrados: usize,
    pub nao_encontrados: usize,
    pub erros: usize,
}

pub struct CpfCheckService {
    state: AppState,
}

impl CpfCheckService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn executar(&self) -> AppResult<ResumoCpf> {
        log_info("Buscando beneficiários no banco...");
        let linhas = self.state.store.listar_cpfs_pendentes().await?;
        log_info(&format!("Total de linhas retornadas: {}", linhas.len()));

        let mut resumo = ResumoCpf {
            total: linhas.len(),
            ..Default::default()
        };
        let mut cache: HashMap<String, ConsultaCpf> = HashMap::new();

        for linha in &linhas {
            let cpf = only_digits(linha.cpf.as_deref().unwrap_or_default());
            if cpf.is_empty() {
                log_warning(&format!("nnumeusua={} sem CPF. Pulando.", linha.nnumeusua));
                resumo.sem_cpf += 1;
                continue;
            }

            let consulta = match cache.get(&cpf) {
                Some(anterior) => {
                    log_info(&format!(
                        "CPF {} já consultado. Reutilizando resultado ({}).",
                        cpf,
                        anterior.status.as_str()
                    ));
                    resumo.reaproveitados += 1;
                    anterior.clone()
                }
                None => {
                    let consulta = self.consultar(&cpf).await;
                    resumo.consultados += 1;
                    cache.insert(cpf.clone(), consulta.clone());
                    tokio::time::sleep(self.state.delay()).await;
                    consulta
                }
            };

            match consulta.status {
                StatusCpf::Encontrado => resumo.encontrados += 1,
                StatusCpf::NaoEncontrado => resumo.nao_encontrados += 1,
                StatusCpf::Erro => resumo.erros += 1,
            }

            self.gravar(linha, &cpf, consulta).await;
        }

        log_info(&format!(
            "Verificação de CPFs concluída: {} encontrados, {} não encontrados, {} erros",
            resumo.encontrados, resumo.nao_encontrados, resumo.erros
        ));
        Ok(resumo)
    }

    async fn consultar(&self, cpf: &str) -> ConsultaCpf {
        let client = self.state.client();
        let empresas = self.state.settings.odontogroup.empresas_associado.as_slice();
        let resultado = self
            .state
            .tokens
            .with_retry(|token| async move { client.associado_emp(&token, cpf, empresas).await.map_err(AppError::from) })
            .await;
        ConsultaCpf::from_resultado(resultado)
    }

    async fn gravar(&self, linha: &CpfCheckRow, cpf: &str, consulta: ConsultaCpf) {
        let log = CpfCheckLog {
            nnumeusua: linha.nnumeusua,
            cpf: cpf.to_string(),
            nome: linha.nome.clone(),
            status: consulta.status,
            http_status: consulta.http_status,
            mensagem: consulta.mensagem,
            json_retorno: consulta.corpo,
        };
        if let Err(e) = self.state.store.registrar_cpf_check(&log).await {
            log_error(&format!(
                "ERRO ao gravar log (nnumeusua={}, cpf={}): {}",
                linha.nnumeusua, cpf, e
            ));
        }
    }
}
