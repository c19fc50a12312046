//! Payloads da APIv3 e da S4E
//!
//! Os nomes de campo seguem exatamente o JSON esperado pelo parceiro
//! (misturando camelCase, snake_case e alguns nomes "soltos" como
//! `fl_AlteraSituacao` e `MMYYYY1Pagamento`).

use crate::client::value_as_i64;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ==================== LOGIN ====================

/// Resposta de `GET /login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,

    /// Segundos ou texto, depende do ambiente
    #[serde(default, alias = "expiresIn", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Value>,
}

impl LoginResponse {
    /// Expiração em segundos, quando numérica
    pub fn expires_in_secs(&self) -> Option<i64> {
        self.expires_in.as_ref().and_then(value_as_i64).filter(|s| *s > 0)
    }

    /// Valor de expiração como texto (para o `.env`)
    pub fn expires_in_text(&self) -> Option<String> {
        match self.expires_in.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ==================== DEPARTAMENTO ====================

/// Corpo de `POST /departamento`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartamentoPayload {
    pub cd_empresa: i64,
    pub nome: String,
    pub nr_cgc: String,
    pub cd_orgao: Option<i64>,
    pub cd_grupo: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpempresa: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classificacao: Option<i64>,

    /// 1 quando `nr_cgc` é um CAEPF
    #[serde(rename = "isCAEPF", default, skip_serializing_if = "Option::is_none")]
    pub is_caepf: Option<i64>,
}

/// Departamento devolvido pela APIv3 (GET ou POST)
#[derive(Debug, Clone, PartialEq)]
pub struct DepartamentoRemoto {
    pub status: u16,
    pub dep_id: Option<i64>,
    /// Apenas dígitos
    pub cnpj: Option<String>,
    pub raw: Value,
}

impl DepartamentoRemoto {
    pub fn from_body(status: u16, raw: Value) -> Self {
        let dep_id = ["depId", "depid", "DepId"]
            .iter()
            .filter_map(|k| raw.get(*k))
            .find_map(value_as_i64)
            .filter(|id| *id > 0);

        let cnpj = ["CNPJ", "cnpj", "nr_cgc", "NR_CGC"]
            .iter()
            .filter_map(|k| raw.get(*k))
            .find_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|s| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>())
            .filter(|s| !s.is_empty());

        Self {
            status,
            dep_id,
            cnpj,
            raw,
        }
    }
}

// ==================== ASSOCIADO PJ ====================

/// Corpo de `POST /AssociadoPJ`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociadoPjRequest {
    pub token: String,
    pub dados: DadosAssociado,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DadosAssociado {
    pub parcela_retida_comissao: String,
    pub incluir_mensalidades: String,
    pub parceiro: Parceiro,
    pub responsavel_financeiro: ResponsavelFinanceiro,
    /// Todas as vidas do contrato, titular incluído
    pub dependente: Vec<Dependente>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parceiro {
    pub codigo: i64,
    pub tipo_cobranca: i64,
    pub adesionista: i64,
    pub max_mensalidade_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsavelFinanceiro {
    pub codigo_contrato: i64,
    pub nome: String,
    pub data_nascimento: Option<String>,
    pub cpf: String,
    pub sexo: i64,
    pub identidade_numero: Option<String>,
    pub identidade_orgao_expeditor: Option<String>,
    pub matricula: String,
    pub data_apresentacao: Option<String>,
    pub dia_vencimento: String,
    pub tipo_pagamento: i64,
    pub origem_venda: i64,
    /// id_odonto do departamento, como texto
    pub departamento: String,
    pub data_assinatura_contrato: Option<String>,
    pub endereco: Endereco,
    #[serde(rename = "fl_AlteraSituacao")]
    pub fl_altera_situacao: i64,
    pub contato_responsavel_financeiro: Vec<Contato>,
}

/// Endereço do responsável financeiro, com os ids da base de CEP da S4E
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endereco {
    pub cep: Option<String>,
    pub tipo_logradouro: Option<i64>,
    pub logradouro: String,
    pub numero: String,
    pub complemento: String,
    pub bairro: Option<i64>,
    pub municipio: Option<i64>,
    pub uf: Option<i64>,
    pub descricao_uf: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contato {
    pub tipo: i64,
    pub dado: String,
}

/// Uma vida (titular ou dependente)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependente {
    pub tipo: i64,
    pub nome: String,
    pub data_nascimento: Option<String>,
    pub cpf: String,
    pub sexo: i64,
    pub plano: i64,
    pub plano_valor: String,
    pub nome_mae: String,
    pub carencia_atendimento: i64,
    #[serde(rename = "MMYYYY1Pagamento")]
    pub mmyyyy_1_pagamento: Option<String>,
    pub funcionario_cadastro: i64,
    pub data_cadastro_lote_contrato: Option<String>,
}

// ==================== NOVO DEPENDENTE (S4E) ====================

/// Corpo de `POST /api/vendedor/NovoDependente`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovoDependenteRequest {
    pub token: String,
    pub dados: DadosNovoDependente,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DadosNovoDependente {
    pub parceiro: ParceiroDependente,
    pub responsavel_financeiro: ContratoFamilia,
    pub dependente: Vec<DependenteNovo>,
    pub contato_dependente: Vec<Contato>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParceiroDependente {
    pub codigo: i64,
    pub adesionista: i64,
}

/// Contrato já existente do titular (`matricula_contrato_familia`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContratoFamilia {
    pub codigo: i64,
    pub data_assinatura_contrato: Option<String>,
}

/// Dependente com os campos extras que a S4E exige (todos vazios/zerados)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependenteNovo {
    #[serde(flatten)]
    pub vida: Dependente,
    #[serde(rename = "numeroProposta")]
    pub numero_proposta: String,
    #[serde(rename = "rcaId")]
    pub rca_id: i64,
    pub cd_orientacao_sexual: i64,
    #[serde(rename = "OutraOrientacaoSexual")]
    pub outra_orientacao_sexual: String,
    pub cd_ident_genero: i64,
    #[serde(rename = "OutraIdentidadeGenero")]
    pub outra_identidade_genero: String,
    #[serde(rename = "idExterno")]
    pub id_externo: String,
    #[serde(rename = "numeroCarteira")]
    pub numero_carteira: String,
    #[serde(rename = "observacaoUsuario")]
    pub observacao_usuario: String,
}

impl From<Dependente> for DependenteNovo {
    fn from(vida: Dependente) -> Self {
        Self {
            vida,
            numero_proposta: String::new(),
            rca_id: 0,
            cd_orientacao_sexual: 0,
            outra_orientacao_sexual: String::new(),
            cd_ident_genero: 0,
            outra_identidade_genero: String::new(),
            id_externo: String::new(),
            numero_carteira: String::new(),
            observacao_usuario: String::new(),
        }
    }
}

// ==================== CEP (S4E) ====================

/// `dados` de `POST /api/redeatendimento/Endereco`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnderecoCep {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id_tipo_logradouro: Option<i64>,
    #[serde(default)]
    pub tipo_logradouro: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id_bairro: Option<i64>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id_municipio: Option<i64>,
    #[serde(default)]
    pub municipio: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id_uf: Option<i64>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(rename = "CodigoMunicipioIBGE", default)]
    pub codigo_municipio_ibge: Option<Value>,
}

/// Aceita número, string numérica ou null
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}
