//! Registros gravados nas tabelas de auditoria da integração

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tamanho de `msg_retorno` nas tabelas de auditoria
pub const MAX_MENSAGEM: usize = 4000;

/// `odonto_benef.status_envio`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEnvio {
    OkVida,
    ErroVida,
    OkDep,
    ErroDep,
}

impl StatusEnvio {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusEnvio::OkVida => "OK_VIDA",
            StatusEnvio::ErroVida => "ERRO_VIDA",
            StatusEnvio::OkDep => "OK_DEP",
            StatusEnvio::ErroDep => "ERRO_DEP",
        }
    }
}

/// Linha de `odonto_benef`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvioLog {
    pub nnumeusua: i64,
    pub id_odonto: Option<i64>,
    pub cpf: String,
    pub nome: String,
    pub status: StatusEnvio,
    pub http_status: Option<u16>,
    pub mensagem: String,
    pub json_enviado: Value,
}

/// `odonto_associado_emp_chk.status_api`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCpf {
    Encontrado,
    NaoEncontrado,
    Erro,
}

impl StatusCpf {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCpf::Encontrado => "ENCONTRADO",
            StatusCpf::NaoEncontrado => "NAO_ENCONTRADO",
            StatusCpf::Erro => "ERRO",
        }
    }
}

/// Vida a verificar em associado-Emp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpfCheckRow {
    pub nnumeusua: i64,
    pub nome: String,
    pub cpf: Option<String>,
    pub departamento: Option<i64>,
}

/// Linha de `odonto_associado_emp_chk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpfCheckLog {
    pub nnumeusua: i64,
    pub cpf: String,
    pub nome: String,
    pub status: StatusCpf,
    pub http_status: Option<u16>,
    pub mensagem: String,
    pub json_retorno: Value,
}

/// Linha de `API_ODONTOGROUP_LOG` (inclusão pela API HTTP)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusaoLog {
    pub nome: String,
    pub id_beneficiario: String,
    pub mensagem: String,
    pub json: Option<Value>,
}
