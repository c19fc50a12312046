use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub odontogroup: OdontogroupSettings,
    pub plano: PlanoSettings,
    pub logs: LogsSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Conexão Oracle (base legada)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_string: Option<String>,
    pub pool_min: u32,
    pub pool_max: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            connect_string: None,
            pool_min: 0,
            pool_max: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OdontogroupSettings {
    /// Base da APIv3 (`.../api`)
    pub base_url: String,
    pub s4e_base_url: String,
    pub s4e_token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Token já emitido (semente do cache)
    pub apiv3_token: Option<String>,
    /// Código de empresa nas consultas de departamento
    pub empresa: String,
    /// Contratos consultados em associado-Emp
    pub empresas_associado: Vec<i64>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    /// Pausa entre chamadas sequenciais nos lotes
    pub delay_ms: u64,
    /// Validade do token quando nem o login nem o JWT informam
    pub token_ttl_seconds: u64,
}

impl Default for OdontogroupSettings {
    fn default() -> Self {
        Self {
            base_url: "https://apiv3.odontogroup.com.br/api".to_string(),
            s4e_base_url: odontogroup::client::S4E_BASE_PADRAO.to_string(),
            s4e_token: None,
            user: None,
            password: None,
            apiv3_token: None,
            empresa: odontogroup::client::EMPRESA_PADRAO.to_string(),
            empresas_associado: odontogroup::associados::EMPRESAS_PADRAO.to_vec(),
            timeout_seconds: 30,
            connect_timeout_seconds: 5,
            delay_ms: 100,
            token_ttl_seconds: 3600,
        }
    }
}

/// Constantes do plano gravadas em cada vida enviada
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlanoSettings {
    /// Parceiro de produção (71709 é o de homologação)
    pub parceiro: i64,
    pub tipo_cobranca: i64,
    pub adesionista: i64,
    pub plano: i64,
    pub plano_valor: String,
    pub funcionario_cadastro: i64,
    pub carencia_atendimento: i64,
    pub tipo_pagamento: i64,
    pub origem_venda: i64,
    pub fl_altera_situacao: i64,
    pub dia_vencimento: String,
    /// Usado quando a natureza do contrato não vem da base
    pub codigo_contrato_padrao: i64,
    /// Contrato para natureza 3 (empresarial)
    pub codigo_contrato_empresarial: i64,
    /// Contrato para natureza 4 (adesão)
    pub codigo_contrato_adesao: i64,
    /// Limite da inclusão em massa pela API
    pub max_inclusoes: usize,
}

impl Default for PlanoSettings {
    fn default() -> Self {
        Self {
            parceiro: 72692,
            tipo_cobranca: 1,
            adesionista: 0,
            plano: 124,
            plano_valor: "6.59".to_string(),
            funcionario_cadastro: 72694,
            carencia_atendimento: 1,
            tipo_pagamento: 513,
            origem_venda: 13,
            fl_altera_situacao: 16,
            dia_vencimento: "01".to_string(),
            codigo_contrato_padrao: 27543,
            codigo_contrato_empresarial: 27552,
            codigo_contrato_adesao: 27543,
            max_inclusoes: 16,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogsSettings {
    /// Raiz dos relatórios JSON (`<dir>/odonto/...`)
    pub dir: String,
    /// Saída dos comandos de geração (`departamentos.json`, token)
    pub out_dir: String,
    pub env_file: String,
}

impl Default for LogsSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            out_dir: "out".to_string(),
            env_file: ".env".to_string(),
        }
    }
}

/// Variáveis herdadas da implantação original → chave de configuração
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DB_USER", "database.user"),
    ("PSW", "database.password"),
    ("DB_CONNECT_STRING", "database.connect_string"),
    ("ODONTO_BASE_APIV3", "odontogroup.base_url"),
    ("ODONTO_S4E_BASE", "odontogroup.s4e_base_url"),
    ("S4E_TOKEN", "odontogroup.s4e_token"),
    ("ODONTO_S4E_TOKEN", "odontogroup.s4e_token"),
    ("ODONTO_USER", "odontogroup.user"),
    ("ODONTO_PASS", "odontogroup.password"),
    ("ODONTO_APIV3_TOKEN", "odontogroup.apiv3_token"),
    ("ODONTO_EMPRESA_CODE", "odontogroup.empresa"),
    ("PORT", "server.port"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("ODONTO_MIDDLEWARE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // Nomes antigos têm precedência (ODONTO_S4E_TOKEN vence S4E_TOKEN)
        for (var, key) in LEGACY_ENV {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    builder = builder.set_override(*key, value)?;
                }
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Cliente da APIv3/S4E com base, token S4E e empresa configurados
    pub fn odontogroup_client(&self) -> odontogroup::Result<odontogroup::OdontogroupClient> {
        let cfg = &self.odontogroup;
        Ok(odontogroup::OdontogroupClient::with_timeouts(
            &cfg.base_url,
            cfg.timeout_seconds,
            cfg.connect_timeout_seconds,
        )?
        .with_s4e(&cfg.s4e_base_url, cfg.s4e_token.clone())
        .with_empresa(&cfg.empresa))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.pool_max, 5);
        assert_eq!(settings.plano.parceiro, 72692);
        assert_eq!(settings.plano.plano_valor, "6.59");
        assert_eq!(settings.odontogroup.empresa, "27552");
        assert_eq!(settings.odontogroup.empresas_associado, vec![27543, 27552]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
            [odontogroup]
            base_url = "https://homapiv3.odontogroup.com.br/api"
            delay_ms = 250

            [plano]
            parceiro = 71709
        "#;
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.odontogroup.base_url, "https://homapiv3.odontogroup.com.br/api");
        assert_eq!(settings.odontogroup.delay_ms, 250);
        assert_eq!(settings.odontogroup.timeout_seconds, 30);
        assert_eq!(settings.plano.parceiro, 71709);
        assert_eq!(settings.plano.tipo_pagamento, 513);
        assert_eq!(settings.logs.dir, "logs");
    }

    #[test]
    fn test_odontogroup_client_from_settings() {
        let mut settings = Settings::default();
        settings.odontogroup.base_url = "http://localhost:9/api/".to_string();
        settings.odontogroup.empresa = "27543".to_string();
        let client = settings.odontogroup_client().unwrap();
        assert_eq!(client.base_url(), "http://localhost:9/api");
        assert_eq!(client.empresa(), "27543");
    }
}
