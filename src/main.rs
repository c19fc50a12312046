/// API HTTP do middleware Odontogroup
///
/// - Consulta de titular/beneficiário e mensalidade na base legada (Oracle)
/// - Consulta de CEP na S4E
/// - Inclusão de beneficiários (individual e em massa) no AssociadoPJ
///
/// As rotinas batch ficam no binário `odonto-cli`.

use std::sync::Arc;
use tokio::net::TcpListener;

use odontogroup_middleware::database::OracleRepository;
use odontogroup_middleware::{config::Settings, handlers, utils, AppState};
use utils::{logging::*, AppError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env é opcional: em produção as variáveis vêm do ambiente
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    init_tracing();
    if dotenv_loaded {
        log_info("✅ Arquivo .env carregado com sucesso");
    }

    let settings = Settings::new().map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;
    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let repository = OracleRepository::connect(&settings.database)?;
    log_info("🗄️ Pool Oracle inicializado");

    let port = settings.server.port;
    let host = settings.server.host.clone();
    let state = Arc::new(AppState::new(settings, Arc::new(repository))?);

    let app = handlers::router(state);
    let listener = TcpListener::bind(format!("{}:{}", host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Falha ao instalar handler de Ctrl+C: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sinal) => {
                sinal.recv().await;
            }
            Err(e) => {
                log_error(&format!("Falha ao instalar handler de SIGTERM: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
