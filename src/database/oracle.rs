use std::sync::Arc;

use async_trait::async_trait;
use oracle::pool::{Pool, PoolBuilder};
use oracle::sql_type::ToSql;
use oracle::{Connection, Row};

use super::queries::*;
use super::{BeneficiarioStore, DepartamentoStore, FiltroVidas, VidaStore};
use crate::config::settings::DatabaseSettings;
use crate::models::*;
use crate::utils::{non_empty, truncate_chars, AppError, AppResult};

/// Pool Oracle da base legada.
///
/// O driver é síncrono: toda chamada roda em `spawn_blocking`.
#[derive(Clone)]
pub struct OracleRepository {
    pool: Arc<Pool>,
}

impl OracleRepository {
    pub fn connect(settings: &DatabaseSettings) -> AppResult<Self> {
        let (user, password, connect_string) = match (
            non_empty(settings.user.clone()),
            non_empty(settings.password.clone()),
            non_empty(settings.connect_string.clone()),
        ) {
            (Some(u), Some(p), Some(c)) => (u, p, c),
            _ => {
                return Err(AppError::ConfigError(
                    "DB_USER, PSW ou DB_CONNECT_STRING não definidos".to_string(),
                ))
            }
        };

        let pool = PoolBuilder::new(user, password, connect_string)
            .min_connections(settings.pool_min)
            .max_connections(settings.pool_max)
            .build()?;

        tracing::info!(
            "🗄️ Pool Oracle criado (min={}, max={})",
            settings.pool_min,
            settings.pool_max
        );

        Ok(Self { pool: Arc::new(pool) })
    }

    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> oracle::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Tarefa Oracle interrompida: {}", e)))?
        .map_err(AppError::from)
    }

    async fn query_vidas(&self, sql: String, binds: Vec<Box<dyn ToSql + Send>>) -> AppResult<Vec<BeneficiarioRow>> {
        self.run(move |conn| {
            let params: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref() as &dyn ToSql).collect();
            let rows = conn.query(&sql, &params)?;
            let mut vidas = Vec::new();
            for row in rows {
                vidas.push(vida_from_row(&row?)?);
            }
            Ok(vidas)
        })
        .await
    }

    async fn execute(&self, sql: &'static str, binds: Vec<Box<dyn ToSql + Send>>) -> AppResult<()> {
        self.run(move |conn| {
            let params: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref() as &dyn ToSql).collect();
            conn.execute(sql, &params)?;
            conn.commit()
        })
        .await
    }

    async fn query_empresa(&self, sql: &'static str, bind: Option<Box<dyn ToSql + Send>>) -> AppResult<Option<EmpresaRow>> {
        self.run(move |conn| {
            let params: Vec<&dyn ToSql> = bind.iter().map(|b| b.as_ref() as &dyn ToSql).collect();
            let mut rows = conn.query(sql, &params)?;
            match rows.next() {
                Some(row) => empresa_from_row(&row?),
                None => Ok(None),
            }
        })
        .await
    }
}

// ==================== MAPEAMENTO ====================

fn texto(row: &Row, coluna: &str) -> oracle::Result<Option<String>> {
    Ok(non_empty(row.get::<_, Option<String>>(coluna)?))
}

fn vida_from_row(row: &Row) -> oracle::Result<BeneficiarioRow> {
    let ctipousua = texto(row, "CTIPOUSUA")?;
    let cgrauusua = texto(row, "CGRAUUSUA")?;
    let csexousua = texto(row, "CSEXOUSUA")?;

    let contato = match (texto(row, "CONTATO")?, texto(row, "TIPO_CONTATO")?) {
        (Some(contato), Some(tipo)) => TipoContato::from_legacy(&tipo).map(|tipo| ContatoRow { contato, tipo }),
        _ => None,
    };

    Ok(BeneficiarioRow {
        nnumeusua: row.get("NNUMEUSUA")?,
        titular: row.get("TITULAR")?,
        nnumetitu: row.get("NNUMETITU")?,
        nnumepess: row.get("NNUMEPESS")?,
        nome: texto(row, "NOME")?.unwrap_or_default(),
        cpf: texto(row, "CPF")?,
        nascimento: texto(row, "NASCIMENTO")?,
        rg: texto(row, "RG")?,
        orgao: texto(row, "ORGAO")?.unwrap_or_else(|| ORGAO_PADRAO.to_string()),
        sexo: codigo_sexo(csexousua.as_deref()),
        nome_mae: texto(row, "NOME_MAE")?,
        tipo_usuario: TipoUsuario::from_legacy(ctipousua.as_deref(), cgrauusua.as_deref()),
        natureza: texto(row, "CNATUTITU")?,
        cnpj_empresa: texto(row, "CNPJ_EMPRESA")?,
        nome_empresa: texto(row, "NOME_EMPRESA")?,
        departamento: row.get("DEPARTAMENTO")?,
        cep: texto(row, "CEP")?,
        numero_endereco: texto(row, "NUMERO_ENDERECO")?,
        inclusao: texto(row, "INCLUSAO")?,
        dinclusua: texto(row, "DINCLUSUA")?,
        data_assinatura: texto(row, "DATA_ASSINATURA")?,
        mmyyyy_1_pagamento: texto(row, "MMYYYY1PAGAMENTO")?,
        contato,
    })
}

fn empresa_from_row(row: &Row) -> oracle::Result<Option<EmpresaRow>> {
    let cnpj = match texto(row, "CNPJ")? {
        Some(cnpj) => cnpj,
        None => return Ok(None),
    };
    Ok(Some(EmpresaRow {
        nome: texto(row, "NOME")?.unwrap_or_default(),
        cnpj,
        natureza: texto(row, "NAT")?,
    }))
}

fn depart_from_row(row: &Row) -> oracle::Result<OdontoDepart> {
    Ok(OdontoDepart {
        id_odonto: row.get("ID_ODONTO")?,
        cnpj: texto(row, "CNPJ")?.unwrap_or_default(),
    })
}

fn json_texto(valor: &serde_json::Value) -> String {
    serde_json::to_string(valor).unwrap_or_default()
}

// ==================== TRAITS ====================

#[async_trait]
impl BeneficiarioStore for OracleRepository {
    async fn buscar_titular(&self, id: i64) -> AppResult<Option<BeneficiarioRow>> {
        Ok(self.query_vidas(sql_beneficiario(false), vec![Box::new(id)]).await?.into_iter().next())
    }

    async fn buscar_beneficiario(&self, id: i64) -> AppResult<Option<BeneficiarioRow>> {
        Ok(self.query_vidas(sql_beneficiario(true), vec![Box::new(id)]).await?.into_iter().next())
    }

    async fn buscar_contatos(&self, id: i64) -> AppResult<Vec<ContatoRow>> {
        self.run(move |conn| {
            let rows = conn.query(SQL_CONTATOS, &[&id, &id])?;
            let mut contatos = Vec::new();
            for row in rows {
                let row = row?;
                if let (Some(contato), Some(tipo)) = (texto(&row, "CONTATO")?, texto(&row, "TIPO_CONTATO")?) {
                    match TipoContato::from_legacy(&tipo) {
                        Some(tipo) => contatos.push(ContatoRow { contato, tipo }),
                        None => tracing::debug!("Contato ignorado (tipo {}) para {}", tipo, id),
                    }
                }
            }
            Ok(contatos)
        })
        .await
    }

    async fn primeira_mensalidade(&self, id: i64) -> AppResult<Option<String>> {
        self.run(move |conn| {
            let mut rows = conn.query(SQL_PRIMEIRA_MENSALIDADE, &[&id])?;
            match rows.next() {
                Some(row) => texto(&row?, "MENSALIDADE"),
                None => Ok(None),
            }
        })
        .await
    }

    async fn listar_elegiveis(&self, limite: usize) -> AppResult<Vec<BeneficiarioRow>> {
        self.query_vidas(sql_elegiveis(), vec![Box::new(limite as i64)]).await
    }

    async fn registrar_inclusao(&self, log: &InclusaoLog) -> AppResult<()> {
        self.execute(
            SQL_INSERT_INCLUSAO_LOG,
            vec![
                Box::new(log.nome.clone()),
                Box::new(log.id_beneficiario.clone()),
                Box::new(truncate_chars(&log.mensagem, MAX_MENSAGEM)),
                Box::new(log.json.as_ref().map(json_texto)),
            ],
        )
        .await
    }
}

#[async_trait]
impl VidaStore for OracleRepository {
    async fn listar_vidas(&self, filtro: &FiltroVidas) -> AppResult<Vec<BeneficiarioRow>> {
        let mut binds: Vec<Box<dyn ToSql + Send>> = Vec::new();
        let mut filtros = filtro_ids(filtro.ids.len(), 1);
        for id in &filtro.ids {
            binds.push(Box::new(*id));
        }
        if let Some(desde) = filtro.desde {
            filtros.push('\n');
            filtros.push_str(&filtro_desde(binds.len() + 1));
            binds.push(Box::new(desde.format("%Y-%m-%d").to_string()));
        }
        self.query_vidas(sql_vidas(&filtros), binds).await
    }

    async fn buscar_titular_vida(&self, titular_id: i64) -> AppResult<Option<BeneficiarioRow>> {
        Ok(self
            .query_vidas(sql_titular_vida(), vec![Box::new(titular_id)])
            .await?
            .into_iter()
            .next())
    }

    async fn registrar_envio(&self, log: &EnvioLog) -> AppResult<()> {
        self.execute(
            SQL_INSERT_ODONTO_BENEF,
            vec![
                Box::new(log.nnumeusua),
                Box::new(log.id_odonto),
                Box::new(log.cpf.clone()),
                Box::new(log.nome.clone()),
                Box::new(log.status.as_str()),
                Box::new(log.http_status.map(i64::from)),
                Box::new(truncate_chars(&log.mensagem, MAX_MENSAGEM)),
                Box::new(json_texto(&log.json_enviado)),
            ],
        )
        .await
    }

    async fn listar_cpfs_pendentes(&self) -> AppResult<Vec<CpfCheckRow>> {
        self.run(|conn| {
            let rows = conn.query(&sql_cpfs_pendentes(), &[])?;
            let mut pendentes = Vec::new();
            for row in rows {
                let row = row?;
                pendentes.push(CpfCheckRow {
                    nnumeusua: row.get("NNUMEUSUA")?,
                    nome: texto(&row, "NOME")?.unwrap_or_default(),
                    cpf: texto(&row, "CPF")?,
                    departamento: row.get("DEPARTAMENTO")?,
                });
            }
            Ok(pendentes)
        })
        .await
    }

    async fn registrar_cpf_check(&self, log: &CpfCheckLog) -> AppResult<()> {
        self.execute(
            SQL_INSERT_CPF_CHECK,
            vec![
                Box::new(log.nnumeusua),
                Box::new(log.cpf.clone()),
                Box::new(log.nome.clone()),
                Box::new(log.status.as_str()),
                Box::new(log.http_status.map(i64::from)),
                Box::new(truncate_chars(&log.mensagem, MAX_MENSAGEM)),
                Box::new(json_texto(&log.json_retorno)),
            ],
        )
        .await
    }
}

#[async_trait]
impl DepartamentoStore for OracleRepository {
    async fn listar_pendentes(&self) -> AppResult<Vec<DepartamentoPendente>> {
        self.run(|conn| {
            let rows = conn.query(SQL_DEPARTAMENTOS_PENDENTES, &[])?;
            let mut pendentes = Vec::new();
            for row in rows {
                let row = row?;
                let Some(nr_cgc) = texto(&row, "NR_CGC")? else { continue };
                pendentes.push(DepartamentoPendente {
                    nome: texto(&row, "NOME")?,
                    nr_cgc,
                    is_caepf: row.get::<_, Option<i64>>("ISCAEPF")?.unwrap_or(0) == 1,
                });
            }
            Ok(pendentes)
        })
        .await
    }

    async fn listar_locais(&self) -> AppResult<Vec<OdontoDepart>> {
        self.run(|conn| {
            let rows = conn.query(SQL_ODONTO_DEPART, &[])?;
            let mut locais = Vec::new();
            for row in rows {
                locais.push(depart_from_row(&row?)?);
            }
            Ok(locais)
        })
        .await
    }

    async fn buscar_local(&self, cnpj: &str) -> AppResult<Option<OdontoDepart>> {
        let cnpj = cnpj.to_string();
        self.run(move |conn| {
            let mut rows = conn.query(SQL_ODONTO_DEPART_POR_CNPJ, &[&cnpj])?;
            match rows.next() {
                Some(row) => Ok(Some(depart_from_row(&row?)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn upsert_departamento(&self, cnpj: &str, id_odonto: Option<i64>) -> AppResult<()> {
        match id_odonto {
            Some(id) => {
                self.execute(SQL_MERGE_ODONTO_DEPART, vec![Box::new(cnpj.to_string()), Box::new(id)])
                    .await
            }
            None => {
                self.execute(
                    SQL_INSERT_ODONTO_DEPART_SEM_ID,
                    vec![Box::new(cnpj.to_string()), Box::new(cnpj.to_string())],
                )
                .await
            }
        }
    }

    async fn atualizar_departamento(&self, cnpj: &str, id_odonto: i64) -> AppResult<()> {
        self.execute(SQL_UPDATE_ODONTO_DEPART, vec![Box::new(id_odonto), Box::new(cnpj.to_string())])
            .await
    }

    async fn listar_empresas_ativas(&self, limite: Option<usize>) -> AppResult<Vec<EmpresaRow>> {
        let limite = limite.map(|l| l as i64).unwrap_or(i64::MAX);
        self.run(move |conn| {
            let rows = conn.query(SQL_EMPRESAS_ATIVAS, &[&limite])?;
            let mut empresas = Vec::new();
            for row in rows {
                if let Some(empresa) = empresa_from_row(&row?)? {
                    empresas.push(empresa);
                }
            }
            Ok(empresas)
        })
        .await
    }

    async fn buscar_empresa(&self, filtro: &FiltroEmpresa) -> AppResult<Option<EmpresaRow>> {
        match filtro {
            FiltroEmpresa::Cnpj(cnpj) => {
                self.query_empresa(SQL_EMPRESA_POR_CNPJ, Some(Box::new(cnpj.clone()))).await
            }
            FiltroEmpresa::Beneficiario(id) => {
                self.query_empresa(SQL_EMPRESA_POR_BENEFICIARIO, Some(Box::new(*id))).await
            }
            FiltroEmpresa::PrimeiraAtiva => self.query_empresa(SQL_PRIMEIRA_EMPRESA_ATIVA, None).await,
        }
    }
}
