//! Leitura do `exp` de um JWT da APIv3 (sem validar assinatura)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::fmt::Display;

use crate::client::value_as_i64;

/// Data de expiração (`exp`, epoch em segundos) do token
pub fn expiracao(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp").and_then(value_as_i64)?;
    DateTime::from_timestamp(exp, 0)
}

/// `dd/MM/yyyy, HH:mm:ss`
pub fn formatar_pt_br<Tz>(data: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    data.format("%d/%m/%Y, %H:%M:%S").to_string()
}
