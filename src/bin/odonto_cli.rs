use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use odontogroup_middleware::config::Settings;
use odontogroup_middleware::database::{FiltroVidas, OracleRepository};
use odontogroup_middleware::models::FiltroEmpresa;
use odontogroup_middleware::services::{
    BeneficiarioSync, CpfCheckService, DepartamentoService, ModoEnvio, TokenService,
};
use odontogroup_middleware::utils::logging::*;
use odontogroup_middleware::utils::only_digits;
use odontogroup_middleware::AppState;

/// Rotinas batch da integração Odontogroup
#[derive(Parser)]
#[command(name = "odonto-cli")]
#[command(version)]
#[command(about = "Rotinas batch da integração Oracle → Odontogroup", long_about = None)]
struct Cli {
    /// Arquivo .env usado pelo comando atualizar-token
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gera out/departamentos-{ts}.json com as empresas ativas
    DepartamentosJson {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Gera out/departamento-{cnpj}.json para uma empresa
    DepartamentoJson {
        /// CNPJ (14 dígitos)
        #[arg(long, conflicts_with = "nnumeusua")]
        cnpj: Option<String>,

        /// Beneficiário (titular ou dependente) da empresa
        #[arg(long)]
        nnumeusua: Option<i64>,
    },

    /// Gera e envia os departamentos das empresas ativas
    EnviarDepartamentos {
        #[arg(long)]
        limit: Option<usize>,

        /// Pausa entre requisições (ms)
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Cria na Odontogroup as empresas ausentes de odonto_depart
    SincronizarDepartamentos,

    /// Atualiza id_odonto local com o depId da APIv3
    CorrigirDepartamentos,

    /// Compara odonto_depart com a APIv3 (somente relatório)
    VerificarDepartamentos,

    /// Consulta em associado-Emp os CPFs ainda não encontrados
    VerificarCpfs,

    /// Monta e envia (ou só gera) os payloads de AssociadoPJ
    Beneficiarios {
        /// Só gera o JSON, sem enviar
        #[arg(long)]
        preview: bool,

        /// nnumeusua separados por vírgula
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Inclusões a partir de (YYYY-MM-DD); padrão: ontem
        #[arg(long)]
        desde: Option<NaiveDate>,
    },

    /// Faz login e grava o token no .env
    AtualizarToken,

    /// Faz login e grava token_apiv3.txt / login_apiv3.json em out/
    Login,

    /// Consulta um CEP na S4E
    Cep { cep: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut settings = Settings::new().context("Falha ao carregar configuração")?;

    match cli.command {
        Commands::AtualizarToken => {
            let tokens = token_service(&settings)?;
            let path = cli.env_file.unwrap_or_else(|| PathBuf::from(&settings.logs.env_file));
            tokens.refresh_env_file(&path).await?;
            println!("✅ Token atualizado em {}", path.display());
        }
        Commands::Login => {
            let tokens = token_service(&settings)?;
            let snapshot = tokens.login_snapshot(&PathBuf::from(&settings.logs.out_dir)).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Cep { cep } => {
            let client = settings.odontogroup_client()?;
            match client.buscar_cep(&only_digits(&cep)).await? {
                Some(endereco) => println!("{}", serde_json::to_string_pretty(&endereco)?),
                None => bail!("CEP inválido ou não encontrado: {}", cep),
            }
        }
        Commands::DepartamentosJson { limit } => {
            let (path, total) = DepartamentoService::new(app_state(settings)?).gerar_json(limit).await?;
            println!("✅ Gerado: {} empresas → {}", total, path.display());
        }
        Commands::DepartamentoJson { cnpj, nnumeusua } => {
            let filtro = match (cnpj, nnumeusua) {
                (Some(cnpj), _) => FiltroEmpresa::Cnpj(only_digits(&cnpj)),
                (None, Some(id)) => FiltroEmpresa::Beneficiario(id),
                (None, None) => FiltroEmpresa::PrimeiraAtiva,
            };
            let (path, payload) = DepartamentoService::new(app_state(settings)?)
                .gerar_json_empresa(&filtro)
                .await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            println!("💾 Salvo em: {}", path.display());
        }
        Commands::EnviarDepartamentos { limit, delay } => {
            if let Some(delay) = delay {
                settings.odontogroup.delay_ms = delay;
            }
            let resultado = DepartamentoService::new(app_state(settings)?).enviar(limit).await?;
            println!("✅ Envio concluído ({})", resultado.gerados.display());
            println!("   • sucesso: {}", resultado.sucessos.len());
            println!("   • erros  : {}", resultado.falhas.len());
        }
        Commands::SincronizarDepartamentos => {
            let resumo = DepartamentoService::new(app_state(settings)?).sincronizar().await?;
            println!("{}", serde_json::to_string_pretty(&resumo)?);
        }
        Commands::CorrigirDepartamentos => {
            let (path, relatorio) = DepartamentoService::new(app_state(settings)?).corrigir().await?;
            println!(
                "Correção finalizada: {} atualizados, {} ignorados, {} erros ({})",
                relatorio.total_atualizados,
                relatorio.total_ignorados,
                relatorio.total_erros,
                path.display()
            );
        }
        Commands::VerificarDepartamentos => {
            let (path, relatorio) = DepartamentoService::new(app_state(settings)?).verificar().await?;
            println!(
                "Verificação finalizada: {} ok, {} inconsistentes, {} erros de API ({})",
                relatorio.total_ok,
                relatorio.total_inconsistentes,
                relatorio.total_erros_api,
                path.display()
            );
        }
        Commands::VerificarCpfs => {
            let resumo = CpfCheckService::new(app_state(settings)?).executar().await?;
            println!("{}", serde_json::to_string_pretty(&resumo)?);
        }
        Commands::Beneficiarios { preview, ids, desde } => {
            let filtro = filtro_vidas(ids, desde);
            let modo = if preview { ModoEnvio::Preview } else { ModoEnvio::Envio };
            let resumo = BeneficiarioSync::new(app_state(settings)?).executar(&filtro, modo).await?;
            println!("{}", serde_json::to_string_pretty(&resumo)?);
        }
    }

    Ok(())
}

fn token_service(settings: &Settings) -> anyhow::Result<TokenService> {
    let client = settings.odontogroup_client()?;
    Ok(TokenService::new(client, &settings.odontogroup))
}

fn app_state(settings: Settings) -> anyhow::Result<AppState> {
    let repository = OracleRepository::connect(&settings.database)?;
    Ok(AppState::new(settings, Arc::new(repository))?)
}

/// Com `--ids` a data é ignorada; sem nenhum filtro, pega as inclusões de ontem em diante
fn filtro_vidas(ids: Vec<i64>, desde: Option<NaiveDate>) -> FiltroVidas {
    if !ids.is_empty() {
        return FiltroVidas { ids, desde: None };
    }
    let desde = desde.or_else(|| Local::now().date_naive().pred_opt());
    FiltroVidas { ids, desde }
}
