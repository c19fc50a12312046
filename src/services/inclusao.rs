//! Inclusão de beneficiários disparada pela API HTTP
//!
//! Diferente do lote, aqui o departamento é resolvido na hora (consulta ou
//! cria na APIv3) e o CEP é obrigatório.

use odontogroup::{ApiResponse, DepartamentoPayload};
use serde::Serialize;
use serde_json::Value;

use crate::models::{BeneficiarioRow, InclusaoLog};
use crate::services::departamentos::cd_empresa_por_natureza;
use crate::utils::logging::*;
use crate::utils::{non_empty, only_digits, AppError, AppResult};
use crate::AppState;

/// Mensagem gravada quando o parceiro não devolve `resultMessage`
pub const MSG_INSERIDO: &str = "Beneficiário inserido com sucesso. ";

/// Resultado por beneficiário da inclusão em massa
#[derive(Debug, Clone, Serialize)]
pub struct ResultadoInclusao {
    pub beneficiario: BeneficiarioRow,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resposta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct InclusaoService {
    state: AppState,
}

impl InclusaoService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Envia o beneficiário (e o titular, se for dependente) por AssociadoPJ
    pub async fn incluir_beneficiario(&self, id: i64) -> AppResult<ApiResponse> {
        let store = &self.state.store;

        let beneficiario = store
            .buscar_beneficiario(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Beneficiário não encontrado.".to_string()))?;

        let mut titular = if beneficiario.is_titular() {
            beneficiario.clone()
        } else {
            store
                .buscar_titular(beneficiario.titular_id())
                .await?
                .unwrap_or_else(|| beneficiario.clone())
        };

        let mensalidade = store.primeira_mensalidade(titular.titular_id()).await?;

        let cep = only_digits(titular.cep.as_deref().unwrap_or_default());
        let endereco = if cep.is_empty() {
            None
        } else {
            self.state.client().buscar_cep(&cep).await?
        };
        let endereco =
            endereco.ok_or_else(|| AppError::ValidationError("CEP inválido ou não encontrado.".to_string()))?;

        titular.departamento = self.garantir_departamento(&titular).await?;
        titular.mmyyyy_1_pagamento = mensalidade.clone();

        let contatos = store
            .buscar_contatos(titular.nnumeusua)
            .await?
            .iter()
            .map(|c| c.to_contato())
            .collect();

        let mut vidas = vec![titular];
        if !beneficiario.is_titular() {
            let mut dependente = beneficiario;
            dependente.mmyyyy_1_pagamento = mensalidade;
            vidas.push(dependente);
        }

        let payloads = self.state.payloads();
        let dados = payloads
            .dados_associado(&vidas, Some(&endereco), contatos)
            .ok_or_else(|| AppError::InternalError("Grupo sem titular".to_string()))?;
        let request = payloads.associado_request(dados);

        let client = self.state.client();
        let request = &request;
        self.state
            .tokens
            .with_retry(|token| async move { client.enviar_associado_pj(&token, request).await.map_err(AppError::from) })
            .await
    }

    /// depId do CNPJ da empresa: consulta, cria se não existir e grava em
    /// `odonto_depart`
    async fn garantir_departamento(&self, titular: &BeneficiarioRow) -> AppResult<Option<i64>> {
        let cnpj = only_digits(titular.cnpj_empresa.as_deref().unwrap_or_default());
        if cnpj.is_empty() {
            log_warning(&format!("⚠️ Beneficiário {} sem CNPJ de empresa", titular.nnumeusua));
            return Ok(None);
        }

        let client = self.state.client();
        let cnpj_ref = cnpj.as_str();

        let existente = match self
            .state
            .tokens
            .with_retry(|token| async move { client.buscar_departamento(&token, cnpj_ref).await.map_err(AppError::from) })
            .await
        {
            Ok(remoto) => remoto.dep_id,
            Err(e) if e.http_status() == Some(404) => None,
            Err(e) => return Err(e),
        };

        let dep_id = match existente {
            Some(id) => Some(id),
            None => {
                let payload = DepartamentoPayload {
                    cd_empresa: cd_empresa_por_natureza(titular.natureza.as_deref(), client.empresa()),
                    nome: titular.nome_empresa.clone().unwrap_or_default(),
                    nr_cgc: cnpj.clone(),
                    cd_orgao: None,
                    cd_grupo: None,
                    tpempresa: None,
                    classificacao: None,
                    is_caepf: None,
                };
                let payload = &payload;
                match self
                    .state
                    .tokens
                    .with_retry(|token| async move { client.criar_departamento(&token, payload).await.map_err(AppError::from) })
                    .await
                {
                    Ok(criado) => criado.dep_id,
                    Err(AppError::OdontogroupApi(e)) if e.is_departamento_ja_existente() => {
                        let token = self.state.tokens.get_token().await?;
                        client.buscar_departamento(&token, &cnpj).await?.dep_id
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        if let Some(id) = dep_id {
            log_departamento_sucesso(&cnpj, id, "API");
            self.state.store.upsert_departamento(&cnpj, Some(id)).await?;
        }
        Ok(dep_id)
    }

    /// Inclusão dos elegíveis, com log em `API_ODONTOGROUP_LOG`
    pub async fn incluir_varios(&self) -> AppResult<Vec<ResultadoInclusao>> {
        let limite = self.state.settings.plano.max_inclusoes;
        let elegiveis = self.state.store.listar_elegiveis(limite).await?;
        log_info(&format!("📋 Inclusão em massa: {} beneficiário(s) elegível(is)", elegiveis.len()));

        let mut resultados = Vec::with_capacity(elegiveis.len());
        for beneficiario in elegiveis {
            let nome = non_empty(Some(beneficiario.nome.clone())).unwrap_or_else(|| "Nome não disponível".to_string());
            let id = beneficiario.nnumeusua.to_string();

            let resultado = match self.incluir_beneficiario(beneficiario.nnumeusua).await {
                Ok(resposta) => {
                    let mensagem = match resposta.result_message() {
                        "" => MSG_INSERIDO.to_string(),
                        msg => msg.to_string(),
                    };
                    self.registrar(InclusaoLog {
                        nome,
                        id_beneficiario: id,
                        mensagem,
                        json: None,
                    })
                    .await;
                    ResultadoInclusao {
                        beneficiario,
                        status: "success",
                        resposta: Some(resposta.body),
                        error: None,
                    }
                }
                Err(e) => {
                    match e.http_status() {
                        Some(status) => log_odonto_api_error("/AssociadoPJ", Some(status), &e.to_string()),
                        None => log_error(&format!("❌ Erro ao incluir beneficiário {}: {}", id, e)),
                    }
                    self.registrar(InclusaoLog {
                        nome,
                        id_beneficiario: id,
                        mensagem: format!("Erro ao incluir beneficiário: {}", e),
                        json: None,
                    })
                    .await;
                    ResultadoInclusao {
                        beneficiario,
                        status: "error",
                        resposta: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            resultados.push(resultado);
            tokio::time::sleep(self.state.delay()).await;
        }

        Ok(resultados)
    }

    async fn registrar(&self, log: InclusaoLog) {
        if let Err(e) = self.state.store.registrar_inclusao(&log).await {
            log_error(&format!("Erro ao salvar o log: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::beneficiario::vida_exemplo;
    use crate::models::{ContatoRow, TipoContato, TipoUsuario};
    use crate::test_support::state_for;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> Arc<MemoryStore> {
        let mut titular = vida_exemplo(10, 10, TipoUsuario::Titular);
        titular.departamento = None;
        let mut conjuge = vida_exemplo(11, 10, TipoUsuario::Conjuge);
        conjuge.departamento = None;
        let store = MemoryStore::with_vidas(vec![titular, conjuge]);
        store.mensalidades.lock().unwrap().insert(10, "022025".to_string());
        store.contatos.lock().unwrap().insert(
            10,
            vec![ContatoRow {
                contato: "titular@acme.com".to_string(),
                tipo: TipoContato::Email,
            }],
        );
        Arc::new(store)
    }

    async fn mock_cep(server: &MockServer, codigo: i64) {
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/api/redeatendimento/Endereco");
                then.status(200).json_body(json!({
                    "codigo": codigo,
                    "dados": {"IdTipoLogradouro": 1, "Logradouro": "XV", "IdBairro": 2, "IdMunicipio": 3, "IdUf": 18, "Uf": "PR"}
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn test_incluir_dependente_com_departamento_existente() {
        let server = MockServer::start_async().await;
        mock_cep(&server, 1).await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/departamento")
                    .query_param("cnpj", "12345678000199");
                then.status(200).json_body(json!({"depId": 77, "CNPJ": "12345678000199"}));
            })
            .await;
        let associado = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ").json_body_partial(
                    r#"{"dados": {"responsavelFinanceiro": {"departamento": "77"}}}"#,
                );
                then.status(200).json_body(json!({"resultMessage": ""}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let service = InclusaoService::new(state_for(&server, store.clone(), dir.path()));

        let resposta = service.incluir_beneficiario(11).await.unwrap();

        associado.assert_async().await;
        assert!(resposta.is_success());
        assert_eq!(store.locais.lock().unwrap()[0].id_odonto, Some(77));
    }

    #[tokio::test]
    async fn test_cep_desconhecido_e_erro() {
        let server = MockServer::start_async().await;
        mock_cep(&server, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let service = InclusaoService::new(state_for(&server, store(), dir.path()));

        match service.incluir_beneficiario(10).await {
            Err(AppError::ValidationError(msg)) => assert_eq!(msg, "CEP inválido ou não encontrado."),
            other => panic!("esperado erro de CEP: {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn test_beneficiario_inexistente() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let service = InclusaoService::new(state_for(&server, store(), dir.path()));
        assert!(matches!(service.incluir_beneficiario(999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_departamento_inexistente_e_criado() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/departamento");
                then.status(404).json_body(json!({}));
            })
            .await;
        let criacao = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/departamento")
                    .json_body_partial(r#"{"cd_empresa": 27552, "nr_cgc": "12345678000199", "nome": "ACME LTDA"}"#);
                then.status(200).json_body(json!({"depId": 88}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let service = InclusaoService::new(state_for(&server, store.clone(), dir.path()));

        let dep_id = service
            .garantir_departamento(&vida_exemplo(10, 10, TipoUsuario::Titular))
            .await
            .unwrap();

        criacao.assert_async().await;
        assert_eq!(dep_id, Some(88));
        assert_eq!(store.locais.lock().unwrap()[0].id_odonto, Some(88));
    }

    #[tokio::test]
    async fn test_incluir_varios_registra_log() {
        let server = MockServer::start_async().await;
        mock_cep(&server, 1).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/departamento");
                then.status(200).json_body(json!({"depId": 77}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ");
                then.status(200)
                    .json_body(json!({"resultMessage": "Titular já cadastrado e ativo no contrato. "}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.vidas.lock().unwrap().push(vida_exemplo(50, 50, TipoUsuario::Titular));
        store.vidas.lock().unwrap()[2].cep = None;
        let service = InclusaoService::new(state_for(&server, store.clone(), dir.path()));

        let resultados = service.incluir_varios().await.unwrap();

        let status: Vec<&str> = resultados.iter().map(|r| r.status).collect();
        assert_eq!(status, vec!["success", "success", "error"]);

        let logs = store.inclusoes.lock().unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].mensagem, "Titular já cadastrado e ativo no contrato. ");
        assert_eq!(logs[2].id_beneficiario, "50");
        assert!(logs[2].mensagem.starts_with("Erro ao incluir beneficiário: "));
    }

    #[test]
    fn test_resultado_serializa_sem_campos_vazios() {
        let resultado = ResultadoInclusao {
            beneficiario: vida_exemplo(1, 1, TipoUsuario::Titular),
            status: "success",
            resposta: Some(json!({"resultMessage": ""})),
            error: None,
        };
        let value = serde_json::to_value(&resultado).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["status"], json!("success"));
    }
}
