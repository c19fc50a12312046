//! Departamentos (empresas contratantes) na Odontogroup
//!
//! Geração de JSON, envio, sincronização dos pendentes e conciliação da
//! tabela local `odonto_depart` com a APIv3.

use std::path::PathBuf;

use chrono::{Local, Utc};
use odontogroup::{DepartamentoPayload, DepartamentoRemoto};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{DepartamentoPendente, EmpresaRow, FiltroEmpresa, OdontoDepart};
use crate::services::report::write_json;
use crate::services::payload_builder::MAX_NOME;
use crate::utils::logging::*;
use crate::utils::{only_digits, truncate_chars, AppError, AppResult};
use crate::AppState;

/// Coletivo empresarial
pub const CD_EMPRESA_EMPRESARIAL: i64 = 27552;
/// Coletivo por adesão
pub const CD_EMPRESA_ADESAO: i64 = 27543;

/// Tipo/classificação de empresa usados nos cadastros em lote
const TPEMPRESA_PADRAO: i64 = 2;
const CLASSIFICACAO_PADRAO: i64 = 2;

/// Limite padrão de empresas na geração em lote
pub const LIMITE_PADRAO: usize = 10;

/// `hsstitu.cnatutitu` → `cd_empresa`; naturezas desconhecidas usam o código configurado
pub fn cd_empresa_por_natureza(natureza: Option<&str>, padrao: &str) -> i64 {
    match natureza.map(str::trim) {
        Some("3") => CD_EMPRESA_EMPRESARIAL,
        Some("4") => CD_EMPRESA_ADESAO,
        _ => padrao.trim().parse().unwrap_or(CD_EMPRESA_EMPRESARIAL),
    }
}

/// Payload de uma empresa ativa; `None` se o CNPJ não tiver 14 dígitos ou faltar nome
pub fn payload_empresa(empresa: &EmpresaRow, padrao: &str) -> Option<DepartamentoPayload> {
    let nome = empresa.nome.trim();
    let cnpj = only_digits(&empresa.cnpj);
    if nome.is_empty() || cnpj.len() != 14 {
        return None;
    }

    Some(DepartamentoPayload {
        cd_empresa: cd_empresa_por_natureza(empresa.natureza.as_deref(), padrao),
        nome: truncate_chars(nome, MAX_NOME),
        nr_cgc: cnpj,
        cd_orgao: None,
        cd_grupo: None,
        tpempresa: None,
        classificacao: None,
        is_caepf: None,
    })
}

/// Corpo do POST para um pendente (CNPJ ou CAEPF)
pub fn payload_pendente(pendente: &DepartamentoPendente, cd_empresa: i64) -> DepartamentoPayload {
    DepartamentoPayload {
        cd_empresa,
        nome: truncate_chars(pendente.nome.as_deref().unwrap_or_default().trim(), MAX_NOME),
        nr_cgc: only_digits(&pendente.nr_cgc),
        cd_orgao: None,
        cd_grupo: None,
        tpempresa: Some(TPEMPRESA_PADRAO),
        classificacao: Some(CLASSIFICACAO_PADRAO),
        is_caepf: Some(i64::from(pendente.is_caepf)),
    }
}

// ==================== CLASSIFICAÇÃO ====================

/// Resultado da comparação local × APIv3
#[derive(Debug, Clone, PartialEq)]
pub enum Verificacao {
    /// Resposta sem depId e sem CNPJ
    SemDadosApi,
    Divergencia {
        cnpj_diferente: bool,
        id_diferente: bool,
        falta_id_local: bool,
    },
    Ok,
}

pub fn verificar_linha(local: &OdontoDepart, remoto: &DepartamentoRemoto) -> Verificacao {
    let cnpj_local = only_digits(&local.cnpj);
    if remoto.dep_id.is_none() && remoto.cnpj.is_none() {
        return Verificacao::SemDadosApi;
    }

    let cnpj_diferente = remoto.cnpj.as_deref() != Some(cnpj_local.as_str());
    let id_diferente = matches!((local.id_odonto, remoto.dep_id), (Some(a), Some(b)) if a != b);
    let falta_id_local = local.id_odonto.is_none();

    if cnpj_diferente || id_diferente || falta_id_local {
        Verificacao::Divergencia {
            cnpj_diferente,
            id_diferente,
            falta_id_local,
        }
    } else {
        Verificacao::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correcao {
    /// Resposta sem depId/CNPJ ou com CNPJ diferente do local
    Incoerente,
    Igual,
    Atualizar(i64),
}

pub fn correcao_linha(local: &OdontoDepart, remoto: &DepartamentoRemoto) -> Correcao {
    let cnpj_local = only_digits(&local.cnpj);
    match (remoto.dep_id, remoto.cnpj.as_deref()) {
        (Some(dep_id), Some(cnpj)) if cnpj == cnpj_local => {
            if local.id_odonto == Some(dep_id) {
                Correcao::Igual
            } else {
                Correcao::Atualizar(dep_id)
            }
        }
        _ => Correcao::Incoerente,
    }
}

// ==================== RELATÓRIOS ====================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumoSincronizacao {
    pub sucesso: usize,
    pub erros: usize,
    pub sem_cnpj: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatorioCorrecao {
    pub total_locais: usize,
    pub total_atualizados: usize,
    pub total_ignorados: usize,
    pub total_erros: usize,
    pub atualizados: Vec<Value>,
    pub ignorados: Vec<Value>,
    pub erros: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatorioVerificacao {
    pub total_locais: usize,
    pub total_ok: usize,
    pub total_inconsistentes: usize,
    pub total_erros_api: usize,
    pub inconsistentes: Vec<Value>,
    pub erros_api: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct ResultadoEnvio {
    pub gerados: PathBuf,
    pub sucessos: Vec<Value>,
    pub falhas: Vec<Value>,
}

/// Corpo devolvido pelo parceiro, ou a mensagem do erro
fn detalhe_erro(erro: &AppError) -> Value {
    match erro {
        AppError::OdontogroupApi(e) => e.body().cloned().unwrap_or_else(|| json!(e.to_string())),
        outro => json!(outro.to_string()),
    }
}

// ==================== SERVIÇO ====================

pub struct DepartamentoService {
    state: AppState,
}

impl DepartamentoService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn empresa(&self) -> &str {
        self.state.client().empresa()
    }

    fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.state.settings.logs.out_dir)
    }

    async fn consultar(&self, cnpj: &str) -> AppResult<DepartamentoRemoto> {
        let client = self.state.client();
        self.state
            .tokens
            .with_retry(|token| async move { client.buscar_departamento(&token, cnpj).await.map_err(AppError::from) })
            .await
    }

    async fn criar(&self, payload: &DepartamentoPayload) -> AppResult<DepartamentoRemoto> {
        let client = self.state.client();
        self.state
            .tokens
            .with_retry(|token| async move { client.criar_departamento(&token, payload).await.map_err(AppError::from) })
            .await
    }

    /// Payloads das empresas ativas com CNPJ válido
    pub async fn payloads_empresas(&self, limite: Option<usize>) -> AppResult<Vec<DepartamentoPayload>> {
        let empresas = self
            .state
            .store
            .listar_empresas_ativas(Some(limite.unwrap_or(LIMITE_PADRAO)))
            .await?;

        let payloads: Vec<DepartamentoPayload> = empresas
            .iter()
            .filter_map(|e| {
                payload_empresa(e, self.empresa()).map(|mut p| {
                    p.tpempresa = Some(TPEMPRESA_PADRAO);
                    p.classificacao = Some(CLASSIFICACAO_PADRAO);
                    p
                })
            })
            .collect();

        if payloads.is_empty() {
            return Err(AppError::ValidationError(
                "Nenhum payload válido (nome vazio/CNPJ inválido).".to_string(),
            ));
        }
        Ok(payloads)
    }

    /// `out/departamentos-{ts}.json`
    pub async fn gerar_json(&self, limite: Option<usize>) -> AppResult<(PathBuf, usize)> {
        let payloads = self.payloads_empresas(limite).await?;
        let ts = Local::now().format("%Y%m%d%H%M%S");
        let path = self.out_dir().join(format!("departamentos-{}.json", ts));
        write_json(&path, &payloads)?;
        log_info(&format!("✅ Gerado: {} empresas", payloads.len()));
        Ok((path, payloads.len()))
    }

    /// `out/departamento-{cnpj}.json` para uma única empresa
    pub async fn gerar_json_empresa(&self, filtro: &FiltroEmpresa) -> AppResult<(PathBuf, DepartamentoPayload)> {
        if let FiltroEmpresa::Cnpj(cnpj) = filtro {
            if cnpj.len() != 14 {
                return Err(AppError::ValidationError(
                    "CNPJ inválido (precisa ter 14 dígitos).".to_string(),
                ));
            }
        }

        let empresa = self
            .state
            .store
            .buscar_empresa(filtro)
            .await?
            .ok_or_else(|| AppError::NotFound("Nenhuma empresa encontrada para gerar o JSON.".to_string()))?;

        let payload = payload_empresa(&empresa, self.empresa()).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Registro inválido (nome vazio ou CNPJ ≠ 14): {} / {}",
                empresa.nome, empresa.cnpj
            ))
        })?;

        let path = self.out_dir().join(format!("departamento-{}.json", payload.nr_cgc));
        write_json(&path, &payload)?;
        Ok((path, payload))
    }

    /// Gera, faz login e envia cada payload; grava os retornos em `out/`
    pub async fn enviar(&self, limite: Option<usize>) -> AppResult<ResultadoEnvio> {
        let payloads = self.payloads_empresas(limite).await?;
        let out = self.out_dir();
        let gerados = out.join("departamentos.json");
        write_json(&gerados, &payloads)?;

        self.state.tokens.refresh().await?;

        let total = payloads.len();
        let mut sucessos = Vec::new();
        let mut falhas = Vec::new();

        for (i, payload) in payloads.iter().enumerate() {
            match self.criar(payload).await {
                Ok(remoto) => {
                    log_info(&format!(
                        "   ✓ [{}/{}] depId={}",
                        i + 1,
                        total,
                        remoto.dep_id.map(|d| d.to_string()).unwrap_or_else(|| "n/a".to_string())
                    ));
                    sucessos.push(json!({
                        "index": i + 1,
                        "input": payload,
                        "status": remoto.status,
                        "output": remoto.raw,
                    }));
                }
                Err(e) => {
                    let status = e.http_status().unwrap_or(0);
                    log_warning(&format!("   ✗ [{}/{}] status={}", i + 1, total, status));
                    falhas.push(json!({
                        "index": i + 1,
                        "input": payload,
                        "status": status,
                        "error": detalhe_erro(&e),
                    }));
                }
            }
            tokio::time::sleep(self.state.delay()).await;
        }

        write_json(&out.join("departamentos-ok.json"), &sucessos)?;
        write_json(&out.join("departamentos-erro.json"), &falhas)?;

        Ok(ResultadoEnvio {
            gerados,
            sucessos,
            falhas,
        })
    }

    /// Cria na APIv3 as empresas ainda ausentes de `odonto_depart`
    pub async fn sincronizar(&self) -> AppResult<ResumoSincronizacao> {
        let pendentes = self.state.store.listar_pendentes().await?;
        log_info(&format!("Departamentos pendentes: {}", pendentes.len()));

        let cd_empresa = cd_empresa_por_natureza(None, self.empresa());
        let mut resumo = ResumoSincronizacao::default();

        for pendente in &pendentes {
            let payload = payload_pendente(pendente, cd_empresa);
            let cnpj = payload.nr_cgc.clone();
            if cnpj.is_empty() {
                log_warning(&format!(
                    "Linha sem CNPJ, pulando. Nome={}",
                    pendente.nome.as_deref().unwrap_or_default()
                ));
                resumo.sem_cnpj += 1;
                continue;
            }

            log_info(&format!("Processando CNPJ={} Nome=\"{}\"", cnpj, payload.nome));

            let sincronizado = match self.criar(&payload).await {
                Ok(remoto) => match remoto.dep_id {
                    Some(dep_id) => self.registrar_sucesso(&payload, dep_id, "POST", &remoto).await,
                    None => self.registrar_erro(&payload, Some(remoto.status), "POST não retornou depId", &remoto.raw),
                },
                Err(AppError::OdontogroupApi(e)) if e.is_departamento_ja_existente() => {
                    log_info(&format!("CNPJ={} já existe (400). Consultando depId...", cnpj));
                    match self.consultar(&cnpj).await {
                        Ok(remoto) => match remoto.dep_id {
                            Some(dep_id) => self.registrar_sucesso(&payload, dep_id, "GET", &remoto).await,
                            None => {
                                self.registrar_erro(&payload, Some(remoto.status), "GET não retornou depId", &remoto.raw)
                            }
                        },
                        Err(e) => self.registrar_erro(&payload, e.http_status(), &e.to_string(), &detalhe_erro(&e)),
                    }
                }
                Err(e) => self.registrar_erro(&payload, e.http_status(), &e.to_string(), &detalhe_erro(&e)),
            };

            match sincronizado {
                Ok(true) => resumo.sucesso += 1,
                Ok(false) => resumo.erros += 1,
                Err(e) => {
                    log_error(&format!("Erro ao gravar departamento {}: {}", cnpj, e));
                    resumo.erros += 1;
                }
            }
            tokio::time::sleep(self.state.delay()).await;
        }

        log_info(&format!(
            "Resumo do dia: sucesso={}, erros={}",
            resumo.sucesso, resumo.erros
        ));
        Ok(resumo)
    }

    async fn registrar_sucesso(
        &self,
        payload: &DepartamentoPayload,
        dep_id: i64,
        origem: &str,
        remoto: &DepartamentoRemoto,
    ) -> AppResult<bool> {
        self.state.store.upsert_departamento(&payload.nr_cgc, Some(dep_id)).await?;
        log_departamento_sucesso(&payload.nr_cgc, dep_id, origem);

        let relatorio = json!({
            "cnpj": payload.nr_cgc,
            "nome": payload.nome,
            "depId": dep_id,
            "origem": origem,
            "httpStatus": remoto.status,
            "status": "success",
            "apiResponse": remoto.raw,
            "createdAt": Utc::now().to_rfc3339(),
        });
        // upsert já gravado: falha no relatório não desfaz o sucesso
        if let Err(e) = self
            .state
            .reports()
            .write(&["departamento", "sucesso"], &payload.nr_cgc, &relatorio)
        {
            log_error(&format!("Falha ao gravar relatório do CNPJ {}: {}", payload.nr_cgc, e));
        }
        Ok(true)
    }

    fn registrar_erro(
        &self,
        payload: &DepartamentoPayload,
        http_status: Option<u16>,
        mensagem: &str,
        resposta: &Value,
    ) -> AppResult<bool> {
        log_departamento_erro(&payload.nr_cgc, http_status, mensagem);

        let relatorio = json!({
            "cnpj": payload.nr_cgc,
            "nome": payload.nome,
            "status": "error",
            "httpStatus": http_status,
            "mensagem": mensagem,
            "apiResponse": resposta,
            "createdAt": Utc::now().to_rfc3339(),
        });
        self.state
            .reports()
            .write(&["departamento", "erro"], &payload.nr_cgc, &relatorio)?;
        Ok(false)
    }

    /// Atualiza `id_odonto` local com o depId da APIv3
    pub async fn corrigir(&self) -> AppResult<(PathBuf, RelatorioCorrecao)> {
        let locais = self.state.store.listar_locais().await?;
        log_info(&format!("Total em odonto_depart: {}", locais.len()));

        let mut relatorio = RelatorioCorrecao {
            total_locais: locais.len(),
            ..Default::default()
        };

        for local in &locais {
            let cnpj = only_digits(&local.cnpj);
            if cnpj.is_empty() {
                continue;
            }

            let remoto = match self.consultar(&cnpj).await {
                Ok(r) => r,
                Err(e) => {
                    log_error(&format!("Erro ao corrigir CNPJ {}: {}", cnpj, e));
                    relatorio.erros.push(json!({
                        "cnpj": cnpj,
                        "idLocal": local.id_odonto,
                        "erro": detalhe_erro(&e),
                    }));
                    continue;
                }
            };

            match correcao_linha(local, &remoto) {
                Correcao::Incoerente => {
                    log_warning(&format!("Ignorando (dados incoerentes): {} / {:?}", cnpj, local.id_odonto));
                    relatorio.ignorados.push(json!({
                        "motivo": "SEM_DADOS_COERENTES",
                        "idLocal": local.id_odonto,
                        "depIdRemoto": remoto.dep_id,
                        "cnpjLocal": cnpj,
                        "cnpjRemoto": remoto.cnpj,
                        "respostaBruta": remoto.raw,
                    }));
                }
                Correcao::Igual => {}
                Correcao::Atualizar(dep_id) => match self.state.store.atualizar_departamento(&cnpj, dep_id).await {
                    Ok(()) => {
                        log_info(&format!("Atualizado CNPJ {}: {:?} -> {}", cnpj, local.id_odonto, dep_id));
                        relatorio.atualizados.push(json!({
                            "cnpj": cnpj,
                            "idAntes": local.id_odonto,
                            "idDepois": dep_id,
                        }));
                    }
                    Err(e) => relatorio.erros.push(json!({
                        "cnpj": cnpj,
                        "idLocal": local.id_odonto,
                        "erro": e.to_string(),
                    })),
                },
            }
            tokio::time::sleep(self.state.delay()).await;
        }

        relatorio.total_atualizados = relatorio.atualizados.len();
        relatorio.total_ignorados = relatorio.ignorados.len();
        relatorio.total_erros = relatorio.erros.len();

        let path = self
            .state
            .reports()
            .write(&["departamento", "fix"], "corrigidos", &relatorio)?;
        Ok((path, relatorio))
    }

    /// Compara `odonto_depart` com a APIv3 sem alterar nada
    pub async fn verificar(&self) -> AppResult<(PathBuf, RelatorioVerificacao)> {
        let locais = self.state.store.listar_locais().await?;
        log_info(&format!("Total de registros em odonto_depart: {}", locais.len()));

        let mut relatorio = RelatorioVerificacao {
            total_locais: locais.len(),
            ..Default::default()
        };

        for local in &locais {
            let cnpj = only_digits(&local.cnpj);
            if cnpj.is_empty() {
                continue;
            }

            match self.consultar(&cnpj).await {
                Ok(remoto) => {
                    let base = json!({
                        "idLocal": local.id_odonto,
                        "depIdRemoto": remoto.dep_id,
                        "cnpjLocal": cnpj,
                        "cnpjRemoto": remoto.cnpj,
                        "respostaBruta": remoto.raw,
                    });
                    match verificar_linha(local, &remoto) {
                        Verificacao::Ok => relatorio.total_ok += 1,
                        Verificacao::SemDadosApi => {
                            log_warning(&format!("SEM_DADOS_API {}", cnpj));
                            relatorio.inconsistentes.push(com_campos(base, json!({"tipo": "SEM_DADOS_API"})));
                        }
                        Verificacao::Divergencia {
                            cnpj_diferente,
                            id_diferente,
                            falta_id_local,
                        } => {
                            log_warning(&format!("DIVERGENCIA {}", cnpj));
                            relatorio.inconsistentes.push(com_campos(
                                base,
                                json!({
                                    "tipo": "DIVERGENCIA",
                                    "cnpjDiferente": cnpj_diferente,
                                    "idDiferente": id_diferente,
                                    "faltaIdLocal": falta_id_local,
                                }),
                            ));
                        }
                    }
                }
                Err(e) => {
                    log_error(&format!("Erro ao consultar CNPJ {}: {}", cnpj, e));
                    relatorio.erros_api.push(json!({
                        "cnpjLocal": cnpj,
                        "idLocal": local.id_odonto,
                        "status": e.http_status(),
                        "resposta": detalhe_erro(&e),
                    }));
                }
            }
            tokio::time::sleep(self.state.delay()).await;
        }

        relatorio.total_inconsistentes = relatorio.inconsistentes.len();
        relatorio.total_erros_api = relatorio.erros_api.len();

        let path = self
            .state
            .reports()
            .write(&["departamento", "check"], "verificacao", &relatorio)?;
        Ok((path, relatorio))
    }
}

fn com_campos(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}
