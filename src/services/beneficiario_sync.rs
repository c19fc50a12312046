//! Envio em lote das vidas para a Odontogroup
//!
//! Fluxo por grupo (titular + dependentes):
//! 1. AssociadoPJ com o grupo inteiro
//! 2. Se o titular já existe no contrato, busca `matricula_contrato_familia`
//!    em associado-Emp e envia cada dependente por NovoDependente
//!
//! Falhas de um grupo são registradas e o lote continua.

use std::path::PathBuf;

use odontogroup::associados::matricula_contrato_familia;
use odontogroup::{ApiResponse, AssociadoPjRequest, EnderecoCep};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::FiltroVidas;
use crate::models::{BeneficiarioRow, EnvioLog, StatusEnvio, MAX_MENSAGEM};
use crate::services::payload_builder::{agrupar_por_titular, contatos_da_vida, resolver_titular};
use crate::utils::logging::*;
use crate::utils::{only_digits, truncate_chars, AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModoEnvio {
    /// Só gera o JSON, sem chamar o parceiro
    Preview,
    Envio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumoEnvio {
    pub grupos: usize,
    pub sem_titular: usize,
    pub vidas_ok: usize,
    pub vidas_erro: usize,
    pub dependentes_ok: usize,
    pub dependentes_erro: usize,
    pub relatorio: Option<PathBuf>,
}

pub struct BeneficiarioSync {
    state: AppState,
}

impl BeneficiarioSync {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn executar(&self, filtro: &FiltroVidas, modo: ModoEnvio) -> AppResult<ResumoEnvio> {
        let vidas = self.state.store.listar_vidas(filtro).await?;
        log_info(&format!("📋 [BENEF] {} vida(s) carregada(s) da base", vidas.len()));

        let mut resumo = ResumoEnvio::default();
        let mut relatorio: Vec<Value> = Vec::new();

        for (titular_id, grupo) in agrupar_por_titular(vidas) {
            resumo.grupos += 1;

            let grupo = match resolver_titular(titular_id, grupo, self.state.store.as_ref()).await {
                Ok(Some(grupo)) => grupo,
                Ok(None) => {
                    log_warning(&format!("⚠️ [BENEF] Grupo titular={} sem titular ativo, ignorado", titular_id));
                    resumo.sem_titular += 1;
                    continue;
                }
                Err(e) => {
                    log_error(&format!("❌ [BENEF] Erro ao buscar titular {}: {}", titular_id, e));
                    resumo.sem_titular += 1;
                    continue;
                }
            };

            let titular = &grupo[0];
            let cep = self.buscar_cep(titular).await;
            let Some(dados) = self
                .state
                .payloads()
                .dados_associado(&grupo, cep.as_ref(), contatos_da_vida(titular))
            else {
                continue;
            };
            let request = self.state.payloads().associado_request(dados);

            match modo {
                ModoEnvio::Preview => {
                    relatorio.push(serde_json::to_value(&request)?);
                }
                ModoEnvio::Envio => {
                    relatorio.push(json!({
                        "tipoEnvio": "AssociadoPJ",
                        "titularId": titular_id,
                        "payload": request,
                    }));
                    self.enviar_grupo(titular_id, &grupo, &request, &mut resumo, &mut relatorio)
                        .await;
                    tokio::time::sleep(self.state.delay()).await;
                }
            }
        }

        if relatorio.is_empty() {
            log_info("[BENEF] Nenhum payload gerado");
        } else {
            let tipo: &[&str] = match modo {
                ModoEnvio::Preview => &["beneficiario", "preview"],
                ModoEnvio::Envio => &["beneficiario", "envio"],
            };
            resumo.relatorio = Some(self.state.reports().write(tipo, "beneficiarios", &relatorio)?);
        }

        log_info(&format!(
            "🏁 [BENEF] grupos={} semTitular={} vidasOk={} vidasErro={} depOk={} depErro={}",
            resumo.grupos,
            resumo.sem_titular,
            resumo.vidas_ok,
            resumo.vidas_erro,
            resumo.dependentes_ok,
            resumo.dependentes_erro
        ));
        Ok(resumo)
    }

    /// CEP do titular; falha na consulta segue com endereço sem ids
    async fn buscar_cep(&self, titular: &BeneficiarioRow) -> Option<EnderecoCep> {
        let cep = only_digits(titular.cep.as_deref().unwrap_or_default());
        if cep.is_empty() {
            return None;
        }
        match self.state.client().buscar_cep(&cep).await {
            Ok(endereco) => endereco,
            Err(e) => {
                log_warning(&format!("⚠️ [BENEF] CEP {} não consultado: {}", cep, e));
                None
            }
        }
    }

    async fn enviar_grupo(
        &self,
        titular_id: i64,
        grupo: &[BeneficiarioRow],
        request: &AssociadoPjRequest,
        resumo: &mut ResumoEnvio,
        relatorio: &mut Vec<Value>,
    ) {
        let titular = &grupo[0];
        let client = self.state.client();
        let json_enviado = match serde_json::to_value(request) {
            Ok(json) => json,
            Err(e) => {
                log_error(&format!("❌ [BENEF] Payload do titular {} não serializado: {}", titular_id, e));
                resumo.vidas_erro += 1;
                return;
            }
        };

        let resultado = self
            .state
            .tokens
            .with_retry(|token| async move { client.enviar_associado_pj(&token, request).await.map_err(AppError::from) })
            .await;

        let (status, resposta) = classificar(&resultado, StatusEnvio::OkVida, StatusEnvio::ErroVida);
        if status == StatusEnvio::OkVida {
            resumo.vidas_ok += 1;
        } else {
            resumo.vidas_erro += 1;
        }
        self.auditar(titular, titular, status, &resposta, json_enviado).await;

        let titular_ja_cadastrado = matches!(&resultado, Ok(r) if r.titular_ja_cadastrado());
        if !titular_ja_cadastrado {
            return;
        }

        log_info(&format!(
            "[BENEF] Titular já cadastrado (grupo titular={}), enviando dependentes via NovoDependente",
            titular_id
        ));

        let dependentes: Vec<&BeneficiarioRow> = grupo.iter().filter(|v| !v.is_titular()).collect();
        if dependentes.is_empty() {
            log_info(&format!("[BENEF] Grupo titular={} não possui dependentes", titular_id));
            return;
        }

        let cpf = only_digits(titular.cpf.as_deref().unwrap_or_default());
        let empresas = &self.state.settings.odontogroup.empresas_associado;
        let matricula = match self
            .state
            .tokens
            .with_retry(|token| {
                let cpf = cpf.clone();
                async move { client.associado_emp(&token, &cpf, empresas).await.map_err(AppError::from) }
            })
            .await
        {
            Ok(vidas) => matricula_contrato_familia(&vidas),
            Err(e) => {
                log_error(&format!("❌ [BENEF] associado-Emp cpf={}: {}", cpf, e));
                None
            }
        };

        let Some(matricula) = matricula else {
            log_warning(&format!(
                "⚠️ [BENEF] matricula_contrato_familia não encontrada para cpf={}. Dependentes não enviados.",
                cpf
            ));
            return;
        };

        for dependente in dependentes {
            tokio::time::sleep(self.state.delay()).await;

            let dados = self.state.payloads().dados_novo_dependente(dependente, titular, matricula);
            let request = self.state.payloads().novo_dependente_request(dados);
            let json_enviado = match serde_json::to_value(&request) {
                Ok(json) => json,
                Err(e) => {
                    log_error(&format!(
                        "❌ [BENEF] Payload do dependente {} não serializado: {}",
                        dependente.nnumeusua, e
                    ));
                    resumo.dependentes_erro += 1;
                    continue;
                }
            };
            relatorio.push(json!({
                "tipoEnvio": "NovoDependente",
                "titularId": titular_id,
                "payload": json_enviado,
            }));

            let resultado = client.enviar_novo_dependente(&request).await.map_err(AppError::from);
            let (status, resposta) = classificar(&resultado, StatusEnvio::OkDep, StatusEnvio::ErroDep);
            if status == StatusEnvio::OkDep {
                resumo.dependentes_ok += 1;
            } else {
                resumo.dependentes_erro += 1;
            }
            self.auditar(dependente, titular, status, &resposta, json_enviado).await;
        }
    }

    async fn auditar(
        &self,
        vida: &BeneficiarioRow,
        titular: &BeneficiarioRow,
        status: StatusEnvio,
        resposta: &Resposta,
        json_enviado: Value,
    ) {
        if let Some(http) = resposta.http_status {
            log_vida_enviada(vida.nnumeusua, http, &resposta.mensagem);
        }

        let log = EnvioLog {
            nnumeusua: vida.nnumeusua,
            id_odonto: titular.departamento,
            cpf: only_digits(vida.cpf.as_deref().unwrap_or_default()),
            nome: vida.nome.clone(),
            status,
            http_status: resposta.http_status,
            mensagem: truncate_chars(&resposta.mensagem, MAX_MENSAGEM),
            json_enviado,
        };
        if let Err(e) = self.state.store.registrar_envio(&log).await {
            log_error(&format!("❌ [BENEF] Falha ao gravar odonto_benef ({}): {}", vida.nnumeusua, e));
        }
    }
}

struct Resposta {
    http_status: Option<u16>,
    mensagem: String,
}

/// 2xx → ok; outro status ou erro de transporte → erro
fn classificar(resultado: &AppResult<ApiResponse>, ok: StatusEnvio, erro: StatusEnvio) -> (StatusEnvio, Resposta) {
    match resultado {
        Ok(resposta) => (
            if resposta.is_success() { ok } else { erro },
            Resposta {
                http_status: Some(resposta.status),
                mensagem: resposta.mensagem(),
            },
        ),
        Err(e) => (
            erro,
            Resposta {
                http_status: e.http_status(),
                mensagem: e.to_string(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::beneficiario::vida_exemplo;
    use crate::models::TipoUsuario;
    use crate::test_support::state_for;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn grupo() -> Vec<BeneficiarioRow> {
        vec![
            vida_exemplo(10, 10, TipoUsuario::Titular),
            vida_exemplo(11, 10, TipoUsuario::Conjuge),
            vida_exemplo(12, 10, TipoUsuario::Filho),
        ]
    }

    async fn mock_cep(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/redeatendimento/Endereco")
                    .query_param("cep", "80020000");
                then.status(200).json_body(json!({
                    "codigo": 1,
                    "dados": {"IdTipoLogradouro": 1, "Logradouro": "XV", "IdBairro": 2, "IdMunicipio": 3, "IdUf": 18, "Uf": "PR"}
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn test_preview_nao_envia() {
        let server = MockServer::start_async().await;
        mock_cep(&server).await;
        let associado = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ");
                then.status(200).json_body(json!({"resultMessage": ""}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_vidas(grupo()));
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Preview).await.unwrap();

        assert_eq!(resumo.grupos, 1);
        associado.assert_hits_async(0).await;
        assert!(store.envios.lock().unwrap().is_empty());

        let path = resumo.relatorio.unwrap();
        assert!(path.to_string_lossy().contains("beneficiario/preview"));
        let conteudo: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(conteudo[0]["token"], json!("s4e"));
        assert_eq!(conteudo[0]["dados"]["dependente"].as_array().unwrap().len(), 3);
        assert_eq!(conteudo[0]["dados"]["responsavelFinanceiro"]["endereco"]["uf"], json!(18));
    }

    #[tokio::test]
    async fn test_envio_ok_audita_vida() {
        let server = MockServer::start_async().await;
        mock_cep(&server).await;
        let associado = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/AssociadoPJ")
                    .query_param("token", "s4e")
                    .header("Authorization", "Bearer apiv3");
                then.status(200).json_body(json!({"resultMessage": "Inclusão realizada", "resultCode": 0}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_vidas(grupo()));
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Envio).await.unwrap();

        associado.assert_async().await;
        assert_eq!(resumo.vidas_ok, 1);
        assert_eq!(resumo.dependentes_ok, 0);

        let envios = store.envios.lock().unwrap();
        assert_eq!(envios.len(), 1);
        assert_eq!(envios[0].status, StatusEnvio::OkVida);
        assert_eq!(envios[0].nnumeusua, 10);
        assert_eq!(envios[0].id_odonto, Some(55));
        assert_eq!(envios[0].http_status, Some(200));
        assert_eq!(envios[0].mensagem, "Inclusão realizada");
        assert_eq!(envios[0].json_enviado["token"], json!("s4e"));
        assert_eq!(envios[0].json_enviado["dados"]["dependente"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_titular_ja_cadastrado_envia_dependentes() {
        let server = MockServer::start_async().await;
        mock_cep(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ");
                then.status(200).json_body(json!({
                    "resultMessage": "Titular já cadastrado e ativo no contrato. ",
                    "resultCode": 3
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/associado-Emp")
                    .query_param("cpf", "00000000010");
                then.status(200).json_body(json!([{"matricula_contrato_familia": 998877}]));
            })
            .await;
        let novo_dependente = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/vendedor/NovoDependente")
                    .query_param("token", "s4e")
                    .json_body_partial(r#"{"dados": {"responsavelFinanceiro": {"codigo": 998877}}}"#);
                then.status(200).json_body(json!({"mensagem": "Dependente incluído"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_vidas(grupo()));
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Envio).await.unwrap();

        novo_dependente.assert_hits_async(2).await;
        assert_eq!(resumo.dependentes_ok, 2);

        let envios = store.envios.lock().unwrap();
        let status: Vec<(i64, StatusEnvio)> = envios.iter().map(|e| (e.nnumeusua, e.status)).collect();
        assert_eq!(
            status,
            vec![(10, StatusEnvio::OkVida), (11, StatusEnvio::OkDep), (12, StatusEnvio::OkDep)]
        );

        let conteudo: Value =
            serde_json::from_str(&std::fs::read_to_string(resumo.relatorio.unwrap()).unwrap()).unwrap();
        let tipos: Vec<&str> = conteudo
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["tipoEnvio"].as_str().unwrap())
            .collect();
        assert_eq!(tipos, vec!["AssociadoPJ", "NovoDependente", "NovoDependente"]);
    }

    #[tokio::test]
    async fn test_erro_http_registra_erro_vida() {
        let server = MockServer::start_async().await;
        mock_cep(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ");
                then.status(422).json_body(json!({"resultMessage": "CPF inválido"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_vidas(grupo()));
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Envio).await.unwrap();

        assert_eq!(resumo.vidas_erro, 1);
        let envios = store.envios.lock().unwrap();
        assert_eq!(envios[0].status, StatusEnvio::ErroVida);
        assert_eq!(envios[0].http_status, Some(422));
        assert_eq!(envios[0].mensagem, "CPF inválido");
    }

    #[tokio::test]
    async fn test_grupo_sem_titular_e_ignorado() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_vidas(vec![vida_exemplo(21, 20, TipoUsuario::Filho)]));
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Envio).await.unwrap();

        assert_eq!(resumo.sem_titular, 1);
        assert!(resumo.relatorio.is_none());
        assert!(store.envios.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falha_ao_buscar_titular_nao_interrompe_lote() {
        let server = MockServer::start_async().await;
        mock_cep(&server).await;

        let mut vidas = grupo();
        vidas.push(vida_exemplo(21, 20, TipoUsuario::Filho));
        let store = MemoryStore::with_vidas(vidas);
        *store.falha_titular_vida.lock().unwrap() = Some("ORA-03113".to_string());
        let store = Arc::new(store);
        let dir = tempfile::tempdir().unwrap();
        let sync = BeneficiarioSync::new(state_for(&server, store.clone(), dir.path()));

        let resumo = sync.executar(&FiltroVidas::default(), ModoEnvio::Preview).await.unwrap();

        assert_eq!(resumo.grupos, 2);
        assert_eq!(resumo.sem_titular, 1);
        let conteudo: Value =
            serde_json::from_str(&std::fs::read_to_string(resumo.relatorio.unwrap()).unwrap()).unwrap();
        assert_eq!(conteudo.as_array().unwrap().len(), 1);
        assert_eq!(conteudo[0]["dados"]["dependente"].as_array().unwrap().len(), 3);
    }
}
