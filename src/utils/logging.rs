use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Subscriber `fmt` com `RUST_LOG` (padrão `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_odonto_api_error(endpoint: &str, status: Option<u16>, error: &str) {
    error!("Odontogroup API error: {} - Status: {:?} - Error: {}", endpoint, status, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Odontogroup middleware server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_token_refreshed(expires_at: &str) {
    info!("🔑 Token APIv3 renovado (expira em {})", expires_at);
}

pub fn log_departamento_sucesso(cnpj: &str, dep_id: i64, origem: &str) {
    info!("✅ [DEPART] CNPJ={} depId={} ({})", cnpj, dep_id, origem);
}

pub fn log_departamento_erro(cnpj: &str, status: Option<u16>, mensagem: &str) {
    error!("❌ [DEPART] Falha CNPJ={} status={:?} msg={}", cnpj, status, mensagem);
}

pub fn log_vida_enviada(nnumeusua: i64, status: u16, mensagem: &str) {
    info!("📤 [BENEF] Vida enviada nnumeusua={} status={} msg={}", nnumeusua, status, mensagem);
}

pub fn log_report_written(path: &str) {
    info!("💾 Relatório gravado em {}", path);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
