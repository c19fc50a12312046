use serde::{Deserialize, Serialize};

/// Empresa ativa (natureza 3) ainda sem linha em `odonto_depart`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartamentoPendente {
    pub nome: Option<String>,
    /// CNPJ, ou CAEPF quando a empresa não tem CNPJ
    pub nr_cgc: String,
    pub is_caepf: bool,
}

/// Linha de `odonto_depart` (CNPJ → depId da Odontogroup)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdontoDepart {
    pub id_odonto: Option<i64>,
    pub cnpj: String,
}

/// Empresa para geração do JSON de /departamento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpresaRow {
    pub nome: String,
    pub cnpj: String,
    /// `hsstitu.cnatutitu`
    pub natureza: Option<String>,
}

/// Como localizar uma única empresa
#[derive(Debug, Clone, PartialEq)]
pub enum FiltroEmpresa {
    Cnpj(String),
    Beneficiario(i64),
    /// Contrato ativo mais recente
    PrimeiraAtiva,
}
