//! Acesso à base legada (Oracle)
//!
//! Os fluxos dependem apenas dos traits abaixo; `OracleRepository` é a
//! implementação real e os testes usam um store em memória.

pub mod oracle;
pub mod queries;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::*;
use crate::utils::AppResult;

pub use self::oracle::OracleRepository;

/// Filtro do lote de beneficiários
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltroVidas {
    /// `hssusua.nnumeusua` específicos
    pub ids: Vec<i64>,
    /// Inclusões no plano a partir desta data
    pub desde: Option<NaiveDate>,
}

/// Consultas usadas pela API HTTP
#[async_trait]
pub trait BeneficiarioStore: Send + Sync {
    /// Vida por id, sem exigir plano odontológico ativo
    async fn buscar_titular(&self, id: i64) -> AppResult<Option<BeneficiarioRow>>;

    /// Vida por id com plano odontológico ativo
    async fn buscar_beneficiario(&self, id: i64) -> AppResult<Option<BeneficiarioRow>>;

    /// Telefones e e-mails principais
    async fn buscar_contatos(&self, id: i64) -> AppResult<Vec<ContatoRow>>;

    /// Vencimento mais antigo (`MMYYYY`)
    async fn primeira_mensalidade(&self, id: i64) -> AppResult<Option<String>>;

    /// Beneficiários elegíveis para inclusão em massa
    async fn listar_elegiveis(&self, limite: usize) -> AppResult<Vec<BeneficiarioRow>>;

    /// `API_ODONTOGROUP_LOG`
    async fn registrar_inclusao(&self, log: &InclusaoLog) -> AppResult<()>;
}

/// Consultas e auditoria dos lotes de vidas
#[async_trait]
pub trait VidaStore: Send + Sync {
    async fn listar_vidas(&self, filtro: &FiltroVidas) -> AppResult<Vec<BeneficiarioRow>>;

    /// Titular ativo com departamento, para grupos que vieram sem ele
    async fn buscar_titular_vida(&self, titular_id: i64) -> AppResult<Option<BeneficiarioRow>>;

    /// `odonto_benef`
    async fn registrar_envio(&self, log: &EnvioLog) -> AppResult<()>;

    /// Vidas ainda não `ENCONTRADO` em associado-Emp
    async fn listar_cpfs_pendentes(&self) -> AppResult<Vec<CpfCheckRow>>;

    /// `odonto_associado_emp_chk`
    async fn registrar_cpf_check(&self, log: &CpfCheckLog) -> AppResult<()>;
}

/// Empresas e `odonto_depart`
#[async_trait]
pub trait DepartamentoStore: Send + Sync {
    async fn listar_pendentes(&self) -> AppResult<Vec<DepartamentoPendente>>;

    async fn listar_locais(&self) -> AppResult<Vec<OdontoDepart>>;

    async fn buscar_local(&self, cnpj: &str) -> AppResult<Option<OdontoDepart>>;

    /// Grava/atualiza o depId; sem id só garante a linha do CNPJ
    async fn upsert_departamento(&self, cnpj: &str, id_odonto: Option<i64>) -> AppResult<()>;

    async fn atualizar_departamento(&self, cnpj: &str, id_odonto: i64) -> AppResult<()>;

    async fn listar_empresas_ativas(&self, limite: Option<usize>) -> AppResult<Vec<EmpresaRow>>;

    async fn buscar_empresa(&self, filtro: &FiltroEmpresa) -> AppResult<Option<EmpresaRow>>;
}

/// Tudo que a aplicação precisa da base
pub trait Store: BeneficiarioStore + VidaStore + DepartamentoStore {}

impl<T: BeneficiarioStore + VidaStore + DepartamentoStore> Store for T {}
