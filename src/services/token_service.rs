//! Token da APIv3
//!
//! Cache em memória (semente: `ODONTO_APIV3_TOKEN`), login sob demanda e
//! um único retry quando a API responde 401.

use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use odontogroup::{jwt, LoginResponse, OdontogroupClient};
use serde_json::json;
use tokio::sync::RwLock;

use crate::config::settings::OdontogroupSettings;
use crate::services::report::write_json;
use crate::utils::logging::*;
use crate::utils::{non_empty, AppError, AppResult};

pub const ENV_TOKEN: &str = "ODONTO_APIV3_TOKEN";
pub const ENV_TOKEN_EXPIRES: &str = "ODONTO_APIV3_TOKEN_EXPIRES";

/// Margem para não usar um token prestes a expirar
const MARGEM_SEGUNDOS: i64 = 30;

#[derive(Debug, Clone, Default)]
struct TokenCache {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenCache {
    fn is_valid(&self, agora: DateTime<Utc>) -> bool {
        match (&self.token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at - Duration::seconds(MARGEM_SEGUNDOS) > agora,
            _ => false,
        }
    }

    fn set(&mut self, token: String, expires_at: DateTime<Utc>) {
        self.token = Some(token);
        self.expires_at = Some(expires_at);
    }

    fn clear(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}

/// Expiração: `expires_in` numérico → `exp` do JWT → TTL padrão
pub fn resolver_expiracao(login: &LoginResponse, ttl_seconds: u64, agora: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(segundos) = login.expires_in_secs() {
        return agora + Duration::seconds(segundos);
    }
    jwt::expiracao(&login.token).unwrap_or_else(|| agora + Duration::seconds(ttl_seconds as i64))
}

pub struct TokenService {
    client: OdontogroupClient,
    user: Option<String>,
    password: Option<String>,
    ttl_seconds: u64,
    cache: Arc<RwLock<TokenCache>>,
}

impl TokenService {
    pub fn new(client: OdontogroupClient, settings: &OdontogroupSettings) -> Self {
        let mut cache = TokenCache::default();
        if let Some(token) = non_empty(settings.apiv3_token.clone()) {
            let expires_at = jwt::expiracao(&token)
                .unwrap_or_else(|| Utc::now() + Duration::seconds(settings.token_ttl_seconds as i64));
            cache.set(token, expires_at);
        }

        Self {
            client,
            user: non_empty(settings.user.clone()),
            password: non_empty(settings.password.clone()),
            ttl_seconds: settings.token_ttl_seconds,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn client(&self) -> &OdontogroupClient {
        &self.client
    }

    /// Token válido do cache ou um novo login
    pub async fn get_token(&self) -> AppResult<String> {
        {
            let cache = self.cache.read().await;
            if cache.is_valid(Utc::now()) {
                if let Some(token) = &cache.token {
                    return Ok(token.clone());
                }
            }
        }

        log_info("🔄 [TOKEN] Cache vazio ou expirado, fazendo login na APIv3...");
        let (token, _) = self.refresh().await?;
        Ok(token)
    }

    /// Login incondicional; atualiza o cache
    pub async fn refresh(&self) -> AppResult<(String, LoginResponse)> {
        let (user, password) = match (&self.user, &self.password) {
            (Some(u), Some(p)) => (u.as_str(), p.as_str()),
            _ => {
                return Err(AppError::ConfigError(
                    "ODONTO_USER / ODONTO_PASS não configurados".to_string(),
                ))
            }
        };

        let login = self.client.login(user, password).await?;
        let expires_at = resolver_expiracao(&login, self.ttl_seconds, Utc::now());
        self.cache.write().await.set(login.token.clone(), expires_at);
        log_token_refreshed(&jwt::formatar_pt_br(&expires_at.with_timezone(&Local)));

        Ok((login.token.clone(), login))
    }

    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }

    /// Executa `op` com o token atual; em 401 renova e tenta mais uma vez
    pub async fn with_retry<T, F, Fut>(&self, op: F) -> AppResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let token = self.get_token().await?;
        match op(token).await {
            Err(err) if err.is_unauthorized() => {
                log_warning("⚠️ [TOKEN] 401 da APIv3, renovando token e repetindo a chamada");
                self.invalidate().await;
                let token = self.get_token().await?;
                op(token).await
            }
            resultado => resultado,
        }
    }

    /// Login e gravação do token no arquivo de ambiente
    pub async fn refresh_env_file(&self, path: &Path) -> AppResult<()> {
        let (token, login) = self.refresh().await?;
        let mut valores = vec![(ENV_TOKEN, token)];
        if let Some(expires) = login.expires_in_text() {
            valores.push((ENV_TOKEN_EXPIRES, expires));
        }
        atualizar_env(path, &valores)?;
        log_info(&format!("✅ [TOKEN] {} atualizado", path.display()));
        Ok(())
    }

    /// Grava `token_apiv3.txt` e `login_apiv3.json` em `out_dir`
    pub async fn login_snapshot(&self, out_dir: &Path) -> AppResult<serde_json::Value> {
        let (token, _) = self.refresh().await?;
        let expires_in = jwt::expiracao(&token)
            .map(|exp| jwt::formatar_pt_br(&exp.with_timezone(&Local)))
            .unwrap_or_default();

        let saida = json!({ "token": token, "expiresIn": expires_in });
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("token_apiv3.txt"), &token)?;
        write_json(&out_dir.join("login_apiv3.json"), &saida)?;
        Ok(saida)
    }
}

/// Substitui as linhas `CHAVE=` existentes e acrescenta as que faltam
pub fn atualizar_env(path: &Path, valores: &[(&str, String)]) -> std::io::Result<()> {
    // Arquivo ausente vira vazio; qualquer outra falha aborta antes do truncate
    let conteudo = match fs::read_to_string(path) {
        Ok(conteudo) => conteudo,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    let mut pendentes: Vec<&(&str, String)> = valores.iter().collect();
    let mut lines = Vec::new();

    for line in conteudo.lines() {
        let encontrado = pendentes
            .iter()
            .position(|(chave, _)| line.starts_with(&format!("{}=", chave)));
        match encontrado {
            Some(idx) => {
                let (chave, valor) = pendentes.remove(idx);
                lines.push(format!("{}={}", chave, valor));
            }
            None => lines.push(line.to_string()),
        }
    }

    for (chave, valor) in pendentes {
        lines.push(format!("{}={}", chave, valor));
    }

    let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use odontogroup::OdontogroupError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(server: &MockServer) -> OdontogroupSettings {
        OdontogroupSettings {
            base_url: server.url("/api"),
            user: Some("integracao".to_string()),
            password: Some("segredo".to_string()),
            ..OdontogroupSettings::default()
        }
    }

    fn service(settings: &OdontogroupSettings) -> TokenService {
        let client = OdontogroupClient::new(&settings.base_url).unwrap();
        TokenService::new(client, settings)
    }

    #[test]
    fn test_resolver_expiracao_prefere_expires_in() {
        let agora = Utc::now();
        let login = LoginResponse {
            token: "opaco".to_string(),
            expires_in: Some(json!(600)),
        };
        assert_eq!(resolver_expiracao(&login, 3600, agora), agora + Duration::seconds(600));

        let sem_expiracao = LoginResponse {
            token: "opaco".to_string(),
            expires_in: Some(json!("01/01/2030, 10:00:00")),
        };
        assert_eq!(resolver_expiracao(&sem_expiracao, 3600, agora), agora + Duration::seconds(3600));
    }

    #[test]
    fn test_cache_validade() {
        let agora = Utc::now();
        let mut cache = TokenCache::default();
        assert!(!cache.is_valid(agora));

        cache.set("tok".to_string(), agora + Duration::seconds(10));
        assert!(!cache.is_valid(agora), "dentro da margem conta como expirado");

        cache.set("tok".to_string(), agora + Duration::seconds(600));
        assert!(cache.is_valid(agora));

        cache.clear();
        assert!(!cache.is_valid(agora));
    }

    #[tokio::test]
    async fn test_get_token_usa_semente_sem_login() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/login");
                then.status(200).json_body(json!({"token": "novo"}));
            })
            .await;

        let mut cfg = settings(&server);
        cfg.apiv3_token = Some("semente".to_string());
        let tokens = service(&cfg);

        assert_eq!(tokens.get_token().await.unwrap(), "semente");
        login.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_get_token_faz_login_uma_vez() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/login")
                    .query_param("user", "integracao")
                    .query_param("password", "segredo");
                then.status(200).json_body(json!({"token": "tok-1", "expiresIn": 3600}));
            })
            .await;

        let tokens = service(&settings(&server));
        assert_eq!(tokens.get_token().await.unwrap(), "tok-1");
        assert_eq!(tokens.get_token().await.unwrap(), "tok-1");
        login.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_with_retry_renova_em_401() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/login");
                then.status(200).json_body(json!({"token": "renovado", "expiresIn": 3600}));
            })
            .await;

        let mut cfg = settings(&server);
        cfg.apiv3_token = Some("velho".to_string());
        let tokens = service(&cfg);
        let chamadas = AtomicUsize::new(0);

        let resultado = tokens
            .with_retry(|token| {
                let n = chamadas.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        assert_eq!(token, "velho");
                        Err(AppError::from(OdontogroupError::Unauthorized("expirado".to_string())))
                    } else {
                        Ok(token)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(resultado, "renovado");
        assert_eq!(chamadas.load(Ordering::SeqCst), 2);
        login.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_with_retry_nao_repete_outros_erros() {
        let server = MockServer::start_async().await;
        let mut cfg = settings(&server);
        cfg.apiv3_token = Some("tok".to_string());
        let tokens = service(&cfg);
        let chamadas = AtomicUsize::new(0);

        let resultado: AppResult<()> = tokens
            .with_retry(|_| {
                chamadas.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::ValidationError("cpf".to_string())) }
            })
            .await;

        assert!(matches!(resultado, Err(AppError::ValidationError(_))));
        assert_eq!(chamadas.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_sem_credenciais() {
        let tokens = TokenService::new(
            OdontogroupClient::new("http://localhost:9/api").unwrap(),
            &OdontogroupSettings::default(),
        );
        assert!(matches!(tokens.refresh().await, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_atualizar_env_preserva_linhas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "DB_USER=odonto\nODONTO_APIV3_TOKEN=antigo\nPSW=x\n").unwrap();

        atualizar_env(
            &path,
            &[
                (ENV_TOKEN, "novo".to_string()),
                (ENV_TOKEN_EXPIRES, "3600".to_string()),
            ],
        )
        .unwrap();

        let conteudo = fs::read_to_string(&path).unwrap();
        assert_eq!(
            conteudo,
            "DB_USER=odonto\nODONTO_APIV3_TOKEN=novo\nPSW=x\nODONTO_APIV3_TOKEN_EXPIRES=3600\n"
        );
    }

    #[test]
    fn test_atualizar_env_nao_utf8_nao_sobrescreve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let original: &[u8] = b"DB_USER=odonto\nPSW=segredo\nNOME=Jo\xE3o\nODONTO_APIV3_TOKEN=velho\n";
        fs::write(&path, original).unwrap();

        let resultado = atualizar_env(&path, &[(ENV_TOKEN, "novo".to_string())]);

        assert_eq!(resultado.unwrap_err().kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_atualizar_env_cria_arquivo_ausente() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        atualizar_env(&path, &[(ENV_TOKEN, "novo".to_string())]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "ODONTO_APIV3_TOKEN=novo\n");
    }

    #[tokio::test]
    async fn test_refresh_env_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/login");
                then.status(200).json_body(json!({"token": "tok-env", "expiresIn": "01/01/2030, 10:00:00"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let tokens = service(&settings(&server));
        tokens.refresh_env_file(&path).await.unwrap();

        let conteudo = fs::read_to_string(&path).unwrap();
        assert!(conteudo.contains("ODONTO_APIV3_TOKEN=tok-env\n"));
        assert!(conteudo.contains("ODONTO_APIV3_TOKEN_EXPIRES=01/01/2030, 10:00:00\n"));
    }

    #[tokio::test]
    async fn test_login_snapshot() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/login");
                then.status(200).json_body(json!({"token": "opaco"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let tokens = service(&settings(&server));
        let saida = tokens.login_snapshot(dir.path()).await.unwrap();

        assert_eq!(saida, json!({"token": "opaco", "expiresIn": ""}));
        assert_eq!(fs::read_to_string(dir.path().join("token_apiv3.txt")).unwrap(), "opaco");
        assert!(dir.path().join("login_apiv3.json").exists());
    }
}
