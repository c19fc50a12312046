//! Store em memória para os testes dos fluxos

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BeneficiarioStore, DepartamentoStore, FiltroVidas, VidaStore};
use crate::models::*;
use crate::utils::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    pub vidas: Mutex<Vec<BeneficiarioRow>>,
    pub contatos: Mutex<HashMap<i64, Vec<ContatoRow>>>,
    pub mensalidades: Mutex<HashMap<i64, String>>,
    pub envios: Mutex<Vec<EnvioLog>>,
    pub inclusoes: Mutex<Vec<InclusaoLog>>,
    pub cpfs_pendentes: Mutex<Vec<CpfCheckRow>>,
    pub cpf_checks: Mutex<Vec<CpfCheckLog>>,
    pub pendentes: Mutex<Vec<DepartamentoPendente>>,
    pub locais: Mutex<Vec<OdontoDepart>>,
    pub empresas: Mutex<Vec<EmpresaRow>>,
    pub filtros: Mutex<Vec<FiltroVidas>>,
    /// Quando preenchido, `buscar_titular_vida` falha com esta mensagem
    pub falha_titular_vida: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with_vidas(vidas: Vec<BeneficiarioRow>) -> Self {
        Self {
            vidas: Mutex::new(vidas),
            ..Self::default()
        }
    }

    fn vida(&self, id: i64) -> Option<BeneficiarioRow> {
        self.vidas.lock().unwrap().iter().find(|v| v.nnumeusua == id).cloned()
    }
}

#[async_trait]
impl BeneficiarioStore for MemoryStore {
    async fn buscar_titular(&self, id: i64) -> AppResult<Option<BeneficiarioRow>> {
        Ok(self.vida(id))
    }

    async fn buscar_beneficiario(&self, id: i64) -> AppResult<Option<BeneficiarioRow>> {
        Ok(self.vida(id))
    }

    async fn buscar_contatos(&self, id: i64) -> AppResult<Vec<ContatoRow>> {
        Ok(self.contatos.lock().unwrap().get(&id).cloned().unwrap_or_default())
    }

    async fn primeira_mensalidade(&self, id: i64) -> AppResult<Option<String>> {
        Ok(self.mensalidades.lock().unwrap().get(&id).cloned())
    }

    async fn listar_elegiveis(&self, limite: usize) -> AppResult<Vec<BeneficiarioRow>> {
        Ok(self.vidas.lock().unwrap().iter().take(limite).cloned().collect())
    }

    async fn registrar_inclusao(&self, log: &InclusaoLog) -> AppResult<()> {
        self.inclusoes.lock().unwrap().push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl VidaStore for MemoryStore {
    async fn listar_vidas(&self, filtro: &FiltroVidas) -> AppResult<Vec<BeneficiarioRow>> {
        self.filtros.lock().unwrap().push(filtro.clone());
        Ok(self
            .vidas
            .lock()
            .unwrap()
            .iter()
            .filter(|v| filtro.ids.is_empty() || filtro.ids.contains(&v.nnumeusua))
            .cloned()
            .collect())
    }

    async fn buscar_titular_vida(&self, titular_id: i64) -> AppResult<Option<BeneficiarioRow>> {
        if let Some(msg) = self.falha_titular_vida.lock().unwrap().clone() {
            return Err(AppError::DatabaseError(msg));
        }
        Ok(self.vida(titular_id).filter(|v| v.is_titular()))
    }

    async fn registrar_envio(&self, log: &EnvioLog) -> AppResult<()> {
        self.envios.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn listar_cpfs_pendentes(&self) -> AppResult<Vec<CpfCheckRow>> {
        Ok(self.cpfs_pendentes.lock().unwrap().clone())
    }

    async fn registrar_cpf_check(&self, log: &CpfCheckLog) -> AppResult<()> {
        self.cpf_checks.lock().unwrap().push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl DepartamentoStore for MemoryStore {
    async fn listar_pendentes(&self) -> AppResult<Vec<DepartamentoPendente>> {
        Ok(self.pendentes.lock().unwrap().clone())
    }

    async fn listar_locais(&self) -> AppResult<Vec<OdontoDepart>> {
        Ok(self.locais.lock().unwrap().clone())
    }

    async fn buscar_local(&self, cnpj: &str) -> AppResult<Option<OdontoDepart>> {
        Ok(self.locais.lock().unwrap().iter().find(|d| d.cnpj == cnpj).cloned())
    }

    async fn upsert_departamento(&self, cnpj: &str, id_odonto: Option<i64>) -> AppResult<()> {
        let mut locais = self.locais.lock().unwrap();
        match locais.iter_mut().find(|d| d.cnpj == cnpj) {
            Some(local) => {
                if id_odonto.is_some() {
                    local.id_odonto = id_odonto;
                }
            }
            None => locais.push(OdontoDepart {
                id_odonto,
                cnpj: cnpj.to_string(),
            }),
        }
        Ok(())
    }

    async fn atualizar_departamento(&self, cnpj: &str, id_odonto: i64) -> AppResult<()> {
        if let Some(local) = self.locais.lock().unwrap().iter_mut().find(|d| d.cnpj == cnpj) {
            local.id_odonto = Some(id_odonto);
        }
        Ok(())
    }

    async fn listar_empresas_ativas(&self, limite: Option<usize>) -> AppResult<Vec<EmpresaRow>> {
        let empresas = self.empresas.lock().unwrap();
        Ok(empresas.iter().take(limite.unwrap_or(usize::MAX)).cloned().collect())
    }

    async fn buscar_empresa(&self, filtro: &FiltroEmpresa) -> AppResult<Option<EmpresaRow>> {
        let empresas = self.empresas.lock().unwrap();
        Ok(match filtro {
            FiltroEmpresa::Cnpj(cnpj) => empresas.iter().find(|e| &e.cnpj == cnpj).cloned(),
            FiltroEmpresa::Beneficiario(id) => {
                let cnpj = self.vida(*id).and_then(|v| v.cnpj_empresa);
                empresas.iter().find(|e| Some(&e.cnpj) == cnpj.as_ref()).cloned()
            }
            FiltroEmpresa::PrimeiraAtiva => empresas.first().cloned(),
        })
    }
}
