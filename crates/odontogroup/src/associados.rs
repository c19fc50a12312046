//! Inclusão de vidas: AssociadoPJ (APIv3), associado-Emp e NovoDependente (S4E)

use crate::client::{capture_response, value_as_i64, ApiResponse, OdontogroupClient};
use crate::error::{OdontogroupError, Result};
use crate::types::{AssociadoPjRequest, NovoDependenteRequest};
use serde_json::Value;

/// Contratos consultados em associado-Emp
pub const EMPRESAS_PADRAO: [i64; 2] = [27543, 27552];

/// Mensagem da APIv3 quando o titular já existe no contrato
pub const MSG_TITULAR_JA_CADASTRADO: &str = "Titular já cadastrado";

/// `resultCode` equivalente a "titular já cadastrado"
pub const CODIGO_TITULAR_JA_CADASTRADO: i64 = 3;

impl ApiResponse {
    /// AssociadoPJ recusou o titular por já existir: os dependentes devem ir
    /// por NovoDependente
    pub fn titular_ja_cadastrado(&self) -> bool {
        self.result_message().contains(MSG_TITULAR_JA_CADASTRADO)
            || self.result_code() == Some(CODIGO_TITULAR_JA_CADASTRADO)
    }
}

/// `matricula_contrato_familia` da primeira vida retornada
pub fn matricula_contrato_familia(vidas: &[Value]) -> Option<i64> {
    vidas
        .first()
        .and_then(|v| v.get("matricula_contrato_familia"))
        .and_then(value_as_i64)
}

fn formatar_empresas(empresas: &[i64]) -> String {
    let lista: Vec<String> = empresas.iter().map(|e| e.to_string()).collect();
    format!("[{}]", lista.join(", "))
}

impl OdontogroupClient {
    /// `GET /associado-Emp?cpf=&empresas=[27543, 27552]`
    ///
    /// Resposta que não é array conta como "nenhuma vida".
    pub async fn associado_emp(&self, token: &str, cpf: &str, empresas: &[i64]) -> Result<Vec<Value>> {
        if cpf.is_empty() {
            return Err(OdontogroupError::ValidationError("CPF é obrigatório".to_string()));
        }

        let empresas = formatar_empresas(empresas);
        let query = [("cpf", cpf), ("empresas", empresas.as_str())];
        let (_, body): (u16, Value) = self.get_json("associado-Emp", token, &query).await?;

        Ok(match body {
            Value::Array(vidas) => vidas,
            _ => Vec::new(),
        })
    }

    /// `POST /AssociadoPJ?token={s4e}` (Bearer APIv3)
    ///
    /// Só 401 vira erro; recusas de negócio chegam no `ApiResponse`.
    pub async fn enviar_associado_pj(&self, token: &str, request: &AssociadoPjRequest) -> Result<ApiResponse> {
        let s4e_token = self.s4e_token()?;
        let url = self.url("AssociadoPJ");
        tracing::debug!("POST {} cpf={}", url, request.dados.responsavel_financeiro.cpf);

        let response = self
            .http()
            .post(&url)
            .query(&[("token", s4e_token)])
            .header("Authorization", format!("Bearer {}", token))
            .json(request)
            .send()
            .await?;

        capture_response(response).await
    }

    /// `POST {s4e}/api/vendedor/NovoDependente?token={s4e}` (sem Bearer)
    pub async fn enviar_novo_dependente(&self, request: &NovoDependenteRequest) -> Result<ApiResponse> {
        let s4e_token = self.s4e_token()?;
        let url = self.s4e_url("api/vendedor/NovoDependente");
        tracing::debug!(
            "POST {} contrato={}",
            url,
            request.dados.responsavel_financeiro.codigo
        );

        let response = self
            .http()
            .post(&url)
            .query(&[("token", s4e_token)])
            .json(request)
            .send()
            .await?;

        capture_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn vida(tipo: i64, cpf: &str) -> Dependente {
        Dependente {
            tipo,
            nome: "FULANO".to_string(),
            data_nascimento: Some("1980-02-03".to_string()),
            cpf: cpf.to_string(),
            sexo: 1,
            plano: 124,
            plano_valor: "6.59".to_string(),
            nome_mae: "MAE".to_string(),
            carencia_atendimento: 1,
            mmyyyy_1_pagamento: None,
            funcionario_cadastro: 72694,
            data_cadastro_lote_contrato: None,
        }
    }

    fn associado() -> AssociadoPjRequest {
        AssociadoPjRequest {
            token: "s4e".to_string(),
            dados: DadosAssociado {
                parcela_retida_comissao: "0".to_string(),
                incluir_mensalidades: "0".to_string(),
                parceiro: Parceiro {
                    codigo: 72692,
                    tipo_cobranca: 1,
                    adesionista: 0,
                    max_mensalidade_id: "0".to_string(),
                },
                responsavel_financeiro: ResponsavelFinanceiro {
                    codigo_contrato: 27552,
                    nome: "FULANO".to_string(),
                    data_nascimento: None,
                    cpf: "11122233344".to_string(),
                    sexo: 1,
                    identidade_numero: None,
                    identidade_orgao_expeditor: Some("SSP".to_string()),
                    matricula: "MAT-11122233344".to_string(),
                    data_apresentacao: None,
                    dia_vencimento: "01".to_string(),
                    tipo_pagamento: 513,
                    origem_venda: 13,
                    departamento: "55".to_string(),
                    data_assinatura_contrato: None,
                    endereco: Endereco::default(),
                    fl_altera_situacao: 16,
                    contato_responsavel_financeiro: vec![],
                },
                dependente: vec![vida(1, "11122233344")],
            },
        }
    }

    fn client(server: &MockServer) -> OdontogroupClient {
        OdontogroupClient::new(server.url("/api"))
            .unwrap()
            .with_s4e(server.base_url(), Some("s4e".to_string()))
    }

    #[test]
    fn test_matricula_contrato_familia() {
        let vidas = vec![json!({"matricula_contrato_familia": "9001"}), json!({"matricula_contrato_familia": 1})];
        assert_eq!(matricula_contrato_familia(&vidas), Some(9001));
        assert_eq!(matricula_contrato_familia(&[]), None);
        assert_eq!(formatar_empresas(&EMPRESAS_PADRAO), "[27543, 27552]");
    }

    #[test]
    fn test_titular_ja_cadastrado() {
        let por_mensagem = ApiResponse {
            status: 200,
            body: json!({"resultMessage": "Titular já cadastrado e ativo no contrato. "}),
        };
        let por_codigo = ApiResponse { status: 200, body: json!({"resultCode": 3}) };
        let ok = ApiResponse { status: 200, body: json!({"resultCode": 0, "resultMessage": ""}) };
        assert!(por_mensagem.titular_ja_cadastrado());
        assert!(por_codigo.titular_ja_cadastrado());
        assert!(!ok.titular_ja_cadastrado());
    }

    #[tokio::test]
    async fn test_associado_emp() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/associado-Emp")
                    .query_param("cpf", "11122233344")
                    .query_param("empresas", "[27543, 27552]");
                then.status(200).json_body(json!([{"matricula_contrato_familia": 777}]));
            })
            .await;

        let vidas = client(&server)
            .associado_emp("tk", "11122233344", &EMPRESAS_PADRAO)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(matricula_contrato_familia(&vidas), Some(777));
    }

    #[tokio::test]
    async fn test_associado_emp_objeto_vira_vazio() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/associado-Emp");
                then.status(200).json_body(json!({"mensagem": "nada"}));
            })
            .await;

        let vidas = client(&server).associado_emp("tk", "1", &EMPRESAS_PADRAO).await.unwrap();
        assert!(vidas.is_empty());
    }

    #[tokio::test]
    async fn test_enviar_associado_pj_recusa_nao_e_erro() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/AssociadoPJ")
                    .query_param("token", "s4e")
                    .header("Authorization", "Bearer tk")
                    .json_body_partial(r#"{"dados": {"parceiro": {"codigo": 72692}}}"#);
                then.status(422).json_body(json!({"resultCode": 3, "resultMessage": "Titular já cadastrado e ativo no contrato. "}));
            })
            .await;

        let resp = client(&server).enviar_associado_pj("tk", &associado()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.status, 422);
        assert!(resp.titular_ja_cadastrado());
    }

    #[tokio::test]
    async fn test_enviar_associado_pj_401() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/AssociadoPJ");
                then.status(401).body("expired");
            })
            .await;

        let err = client(&server).enviar_associado_pj("tk", &associado()).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_enviar_associado_pj_sem_token_s4e() {
        let c = OdontogroupClient::new("http://localhost:1/api").unwrap();
        assert!(matches!(
            c.enviar_associado_pj("tk", &associado()).await,
            Err(OdontogroupError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_enviar_novo_dependente() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/vendedor/NovoDependente")
                    .query_param("token", "s4e")
                    .json_body_partial(r#"{"dados": {"responsavelFinanceiro": {"codigo": 777}, "contatoDependente": []}}"#);
                then.status(200).json_body(json!({"mensagem": "Dependente incluído"}));
            })
            .await;

        let request = NovoDependenteRequest {
            token: "s4e".to_string(),
            dados: DadosNovoDependente {
                parceiro: ParceiroDependente { codigo: 72692, adesionista: 0 },
                responsavel_financeiro: ContratoFamilia {
                    codigo: 777,
                    data_assinatura_contrato: Some("2025-01-10".to_string()),
                },
                dependente: vec![vida(4, "99988877766").into()],
                contato_dependente: vec![],
            },
        };

        let resp = client(&server).enviar_novo_dependente(&request).await.unwrap();

        mock.assert_async().await;
        assert!(resp.is_success());
        assert_eq!(resp.mensagem(), "Dependente incluído");
    }
}
