// Biblioteca do middleware Odontogroup
// Expõe módulos para uso em testes e binários

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use odontogroup::OdontogroupClient;

// AppState é definido aqui para ser compartilhado entre a API e o CLI
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn database::Store>,
    pub tokens: Arc<services::TokenService>,
}

impl AppState {
    pub fn new(settings: config::Settings, store: Arc<dyn database::Store>) -> utils::AppResult<Self> {
        let client = settings.odontogroup_client()?;
        let tokens = Arc::new(services::TokenService::new(client, &settings.odontogroup));
        Ok(Self {
            settings,
            store,
            tokens,
        })
    }

    pub fn client(&self) -> &OdontogroupClient {
        self.tokens.client()
    }

    pub fn reports(&self) -> services::ReportWriter {
        services::ReportWriter::new(&self.settings.logs.dir)
    }

    pub fn payloads(&self) -> services::PayloadBuilder {
        services::PayloadBuilder::new(self.settings.plano.clone(), self.settings.odontogroup.s4e_token.clone())
    }

    /// Pausa entre chamadas sequenciais ao parceiro
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.settings.odontogroup.delay_ms)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::database::memory::MemoryStore;
    use httpmock::MockServer;

    /// Estado apontando APIv3 e S4E para o mock, com token já em cache
    pub fn state_for(server: &MockServer, store: Arc<MemoryStore>, logs_dir: &std::path::Path) -> AppState {
        let mut settings = config::Settings::default();
        settings.odontogroup.base_url = server.url("/api");
        settings.odontogroup.s4e_base_url = server.base_url();
        settings.odontogroup.s4e_token = Some("s4e".to_string());
        settings.odontogroup.apiv3_token = Some("apiv3".to_string());
        settings.odontogroup.user = Some("integracao".to_string());
        settings.odontogroup.password = Some("segredo".to_string());
        settings.odontogroup.delay_ms = 0;
        settings.logs.dir = logs_dir.join("logs").display().to_string();
        settings.logs.out_dir = logs_dir.join("out").display().to_string();
        settings.logs.env_file = logs_dir.join(".env").display().to_string();
        AppState::new(settings, store).unwrap()
    }
}
