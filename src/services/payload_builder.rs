//! Montagem dos payloads de AssociadoPJ e NovoDependente a partir das vidas
//! da base legada

use odontogroup::{
    AssociadoPjRequest, Contato, ContratoFamilia, DadosAssociado, DadosNovoDependente, Dependente,
    Endereco, EnderecoCep, NovoDependenteRequest, Parceiro, ParceiroDependente, ResponsavelFinanceiro,
};

use crate::config::settings::PlanoSettings;
use crate::database::VidaStore;
use crate::models::BeneficiarioRow;
use crate::utils::{only_digits, truncate_chars, AppResult};

/// Limite de caracteres para nomes enviados ao parceiro
pub const MAX_NOME: usize = 70;

/// Natureza do contrato de adesão
const NATUREZA_ADESAO: &str = "4";

/// Vidas agrupadas por titular, na ordem em que o titular apareceu
pub fn agrupar_por_titular(vidas: Vec<BeneficiarioRow>) -> Vec<(i64, Vec<BeneficiarioRow>)> {
    let mut grupos: Vec<(i64, Vec<BeneficiarioRow>)> = Vec::new();
    for vida in vidas {
        let titular = vida.titular_id();
        match grupos.iter_mut().find(|(id, _)| *id == titular) {
            Some((_, grupo)) => grupo.push(vida),
            None => grupos.push((titular, vec![vida])),
        }
    }
    grupos
}

/// Garante o titular no grupo (buscando na base quando não veio no lote).
///
/// Devolve o grupo com o titular na primeira posição, ou `None` quando
/// nem a base tem o titular.
pub async fn resolver_titular<S>(
    titular_id: i64,
    mut grupo: Vec<BeneficiarioRow>,
    store: &S,
) -> AppResult<Option<Vec<BeneficiarioRow>>>
where
    S: VidaStore + ?Sized,
{
    if let Some(pos) = grupo.iter().position(|v| v.is_titular()) {
        let titular = grupo.remove(pos);
        grupo.insert(0, titular);
        return Ok(Some(grupo));
    }

    match store.buscar_titular_vida(titular_id).await? {
        Some(titular) => {
            grupo.insert(0, titular);
            Ok(Some(grupo))
        }
        None => Ok(None),
    }
}

/// Data de inclusão: `inclusao` → `dinclusua` → assinatura
pub fn data_inclusao(vida: &BeneficiarioRow) -> Option<String> {
    vida.inclusao
        .clone()
        .or_else(|| vida.dinclusua.clone())
        .or_else(|| vida.data_assinatura.clone())
}

/// Endereço do titular; sem CEP encontrado os ids vão nulos
pub fn endereco(titular: &BeneficiarioRow, cep: Option<&EnderecoCep>) -> Endereco {
    let cep_titular = titular.cep.as_deref().map(only_digits).filter(|c| !c.is_empty());
    let numero = titular
        .numero_endereco
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("0")
        .to_string();

    Endereco {
        cep: cep_titular,
        tipo_logradouro: cep.and_then(|c| c.id_tipo_logradouro),
        logradouro: cep.and_then(|c| c.logradouro.clone()).unwrap_or_default(),
        numero,
        complemento: String::new(),
        bairro: cep.and_then(|c| c.id_bairro),
        municipio: cep.and_then(|c| c.id_municipio),
        uf: cep.and_then(|c| c.id_uf),
        descricao_uf: cep.and_then(|c| c.uf.clone()).unwrap_or_default(),
    }
}

/// Constantes do plano + regras de contrato
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    plano: PlanoSettings,
    s4e_token: String,
}

impl PayloadBuilder {
    pub fn new(plano: PlanoSettings, s4e_token: Option<String>) -> Self {
        Self {
            plano,
            s4e_token: s4e_token.unwrap_or_default(),
        }
    }

    pub fn plano(&self) -> &PlanoSettings {
        &self.plano
    }

    /// Natureza 4 → adesão; qualquer outra → empresarial; sem natureza → padrão
    pub fn codigo_contrato(&self, natureza: Option<&str>) -> i64 {
        match natureza.map(str::trim) {
            Some(NATUREZA_ADESAO) => self.plano.codigo_contrato_adesao,
            Some(_) => self.plano.codigo_contrato_empresarial,
            None => self.plano.codigo_contrato_padrao,
        }
    }

    pub fn dependente(&self, vida: &BeneficiarioRow, inclusao_titular: Option<&str>) -> Dependente {
        Dependente {
            tipo: vida.tipo_usuario.codigo(),
            nome: truncate_chars(&vida.nome, MAX_NOME),
            data_nascimento: vida.nascimento.clone(),
            cpf: only_digits(vida.cpf.as_deref().unwrap_or_default()),
            sexo: vida.sexo,
            plano: self.plano.plano,
            plano_valor: self.plano.plano_valor.clone(),
            nome_mae: truncate_chars(vida.nome_mae.as_deref().unwrap_or_default(), MAX_NOME),
            carencia_atendimento: self.plano.carencia_atendimento,
            mmyyyy_1_pagamento: vida.mmyyyy_1_pagamento.clone(),
            funcionario_cadastro: self.plano.funcionario_cadastro,
            data_cadastro_lote_contrato: data_inclusao(vida).or_else(|| inclusao_titular.map(str::to_string)),
        }
    }

    /// Grupo completo (titular em `vidas[0]`) para AssociadoPJ
    pub fn dados_associado(
        &self,
        vidas: &[BeneficiarioRow],
        cep: Option<&EnderecoCep>,
        contatos: Vec<Contato>,
    ) -> Option<DadosAssociado> {
        let titular = vidas.first()?;
        let cpf = only_digits(titular.cpf.as_deref().unwrap_or_default());
        let inclusao = data_inclusao(titular);

        Some(DadosAssociado {
            parcela_retida_comissao: "0".to_string(),
            incluir_mensalidades: "0".to_string(),
            parceiro: Parceiro {
                codigo: self.plano.parceiro,
                tipo_cobranca: self.plano.tipo_cobranca,
                adesionista: self.plano.adesionista,
                max_mensalidade_id: "0".to_string(),
            },
            responsavel_financeiro: ResponsavelFinanceiro {
                codigo_contrato: self.codigo_contrato(titular.natureza.as_deref()),
                nome: truncate_chars(&titular.nome, MAX_NOME),
                data_nascimento: titular.nascimento.clone(),
                matricula: format!("MAT-{}", cpf),
                cpf,
                sexo: titular.sexo,
                identidade_numero: titular.rg.clone(),
                identidade_orgao_expeditor: Some(titular.orgao.clone()),
                data_apresentacao: inclusao.clone(),
                dia_vencimento: self.plano.dia_vencimento.clone(),
                tipo_pagamento: self.plano.tipo_pagamento,
                origem_venda: self.plano.origem_venda,
                departamento: titular.departamento.map(|d| d.to_string()).unwrap_or_default(),
                data_assinatura_contrato: inclusao.clone(),
                endereco: endereco(titular, cep),
                fl_altera_situacao: self.plano.fl_altera_situacao,
                contato_responsavel_financeiro: contatos,
            },
            dependente: vidas.iter().map(|v| self.dependente(v, inclusao.as_deref())).collect(),
        })
    }

    pub fn dados_novo_dependente(
        &self,
        dependente: &BeneficiarioRow,
        titular: &BeneficiarioRow,
        matricula_contrato_familia: i64,
    ) -> DadosNovoDependente {
        let assinatura = titular.data_assinatura.clone().or_else(|| titular.inclusao.clone());
        let vida = self.dependente(dependente, assinatura.as_deref());
        let assinatura = assinatura.or_else(|| vida.data_cadastro_lote_contrato.clone());

        DadosNovoDependente {
            parceiro: ParceiroDependente {
                codigo: self.plano.parceiro,
                adesionista: self.plano.adesionista,
            },
            responsavel_financeiro: ContratoFamilia {
                codigo: matricula_contrato_familia,
                data_assinatura_contrato: assinatura,
            },
            dependente: vec![vida.into()],
            contato_dependente: Vec::new(),
        }
    }

    pub fn associado_request(&self, dados: DadosAssociado) -> AssociadoPjRequest {
        AssociadoPjRequest {
            token: self.s4e_token.clone(),
            dados,
        }
    }

    pub fn novo_dependente_request(&self, dados: DadosNovoDependente) -> NovoDependenteRequest {
        NovoDependenteRequest {
            token: self.s4e_token.clone(),
            dados,
        }
    }
}

/// Contato principal do titular, quando houver
pub fn contatos_da_vida(vida: &BeneficiarioRow) -> Vec<Contato> {
    vida.contato.iter().map(|c| c.to_contato()).collect()
}
