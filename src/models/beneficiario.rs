use serde::{Deserialize, Serialize};

/// Relação da vida com o contrato, no código da Odontogroup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoUsuario {
    Titular,
    Conjuge,
    Filho,
    Enteado,
    Pais,
    Outro,
}

impl TipoUsuario {
    /// `hssusua.ctipousua` + `hssusua.cgrauusua`
    pub fn from_legacy(ctipousua: Option<&str>, cgrauusua: Option<&str>) -> Self {
        match ctipousua.map(str::trim) {
            Some("T") => TipoUsuario::Titular,
            Some("D") => match cgrauusua.map(str::trim) {
                Some("F") => TipoUsuario::Filho,
                Some("E") | Some("J") => TipoUsuario::Conjuge,
                Some("H") => TipoUsuario::Enteado,
                Some("P") | Some("M") => TipoUsuario::Pais,
                _ => TipoUsuario::Outro,
            },
            _ => TipoUsuario::Outro,
        }
    }

    pub fn codigo(self) -> i64 {
        match self {
            TipoUsuario::Titular => 1,
            TipoUsuario::Conjuge => 3,
            TipoUsuario::Filho => 4,
            TipoUsuario::Enteado => 6,
            TipoUsuario::Pais => 8,
            TipoUsuario::Outro => 10,
        }
    }
}

/// Marcador usado pelas consultas para contatos vindos de `hssemap`
pub const ORIGEM_EMAIL: &str = "MAIL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoContato {
    Fixo,
    Celular,
    Whatsapp,
    Email,
}

impl TipoContato {
    /// `hssfonp.ctipofonp` (ou [`ORIGEM_EMAIL`]); tipos sem equivalente são descartados
    pub fn from_legacy(tipo: &str) -> Option<Self> {
        match tipo.trim() {
            "E" => Some(TipoContato::Celular),
            "R" | "C" => Some(TipoContato::Fixo),
            "W" => Some(TipoContato::Whatsapp),
            ORIGEM_EMAIL => Some(TipoContato::Email),
            _ => None,
        }
    }

    pub fn codigo(self) -> i64 {
        match self {
            TipoContato::Fixo => 1,
            TipoContato::Celular => 8,
            TipoContato::Whatsapp => 10,
            TipoContato::Email => 50,
        }
    }
}

/// `M` → 1, qualquer outro valor → 0
pub fn codigo_sexo(csexousua: Option<&str>) -> i64 {
    match csexousua.map(str::trim) {
        Some("M") => 1,
        _ => 0,
    }
}

/// Órgão expedidor padrão quando a base não informa
pub const ORGAO_PADRAO: &str = "SSP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContatoRow {
    pub contato: String,
    pub tipo: TipoContato,
}

impl ContatoRow {
    pub fn to_contato(&self) -> odontogroup::Contato {
        odontogroup::Contato {
            tipo: self.tipo.codigo(),
            dado: self.contato.clone(),
        }
    }
}

/// Uma vida da base legada (titular ou dependente), já com os códigos
/// convertidos para a Odontogroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiarioRow {
    pub nnumeusua: i64,
    /// `ntituusua`
    pub titular: Option<i64>,
    pub nnumetitu: Option<i64>,
    pub nnumepess: Option<i64>,
    pub nome: String,
    pub cpf: Option<String>,
    pub nascimento: Option<String>,
    pub rg: Option<String>,
    pub orgao: String,
    pub sexo: i64,
    pub nome_mae: Option<String>,
    pub tipo_usuario: TipoUsuario,
    /// `hsstitu.cnatutitu`
    pub natureza: Option<String>,
    pub cnpj_empresa: Option<String>,
    pub nome_empresa: Option<String>,
    /// `odonto_depart.id_odonto`
    pub departamento: Option<i64>,
    pub cep: Option<String>,
    pub numero_endereco: Option<String>,
    pub inclusao: Option<String>,
    pub dinclusua: Option<String>,
    pub data_assinatura: Option<String>,
    pub mmyyyy_1_pagamento: Option<String>,
    /// Contato principal (telefone antes de e-mail)
    pub contato: Option<ContatoRow>,
}

impl BeneficiarioRow {
    pub fn is_titular(&self) -> bool {
        self.tipo_usuario == TipoUsuario::Titular
    }

    /// Chave de agrupamento: o titular, ou a própria vida
    pub fn titular_id(&self) -> i64 {
        self.titular.unwrap_or(self.nnumeusua)
    }
}

#[cfg(test)]
pub(crate) fn vida_exemplo(nnumeusua: i64, titular: i64, tipo: TipoUsuario) -> BeneficiarioRow {
    BeneficiarioRow {
        nnumeusua,
        titular: Some(titular),
        nnumetitu: Some(500),
        nnumepess: Some(nnumeusua * 10),
        nome: format!("VIDA {}", nnumeusua),
        cpf: Some(format!("{:011}", nnumeusua)),
        nascimento: Some("1990-01-15".to_string()),
        rg: Some("1234567".to_string()),
        orgao: ORGAO_PADRAO.to_string(),
        sexo: 1,
        nome_mae: Some("MAE".to_string()),
        tipo_usuario: tipo,
        natureza: Some("3".to_string()),
        cnpj_empresa: Some("12345678000199".to_string()),
        nome_empresa: Some("ACME LTDA".to_string()),
        departamento: Some(55),
        cep: Some("80020-000".to_string()),
        numero_endereco: Some("100".to_string()),
        inclusao: Some("2025-01-10".to_string()),
        dinclusua: Some("2025-01-09".to_string()),
        data_assinatura: Some("2025-01-10".to_string()),
        mmyyyy_1_pagamento: Some("012025".to_string()),
        contato: None,
    }
}
