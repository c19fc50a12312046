//! Relatórios JSON dos processos batch
//!
//! Estrutura: `<logs.dir>/odonto/<tipo...>/YYYY/MM/DD/HHMMSS_<nome>.json`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::utils::logging::log_report_written;
use crate::utils::AppResult;

#[derive(Debug, Clone)]
pub struct ReportWriter {
    root: PathBuf,
}

impl ReportWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Diretório do dia para o tipo de relatório
    pub fn dir_for(&self, tipo: &[&str], quando: &DateTime<Local>) -> PathBuf {
        let mut dir = self.root.join("odonto");
        for parte in tipo {
            dir.push(parte);
        }
        dir.push(quando.format("%Y").to_string());
        dir.push(quando.format("%m").to_string());
        dir.push(quando.format("%d").to_string());
        dir
    }

    pub fn write<T: Serialize + ?Sized>(&self, tipo: &[&str], nome: &str, valor: &T) -> AppResult<PathBuf> {
        self.write_at(tipo, nome, valor, &Local::now())
    }

    pub fn write_at<T: Serialize + ?Sized>(
        &self,
        tipo: &[&str],
        nome: &str,
        valor: &T,
        quando: &DateTime<Local>,
    ) -> AppResult<PathBuf> {
        let arquivo = format!("{}_{}.json", quando.format("%H%M%S"), nome);
        let path = self.dir_for(tipo, quando).join(arquivo);
        write_json(&path, valor)?;
        Ok(path)
    }
}

/// Grava JSON indentado, criando os diretórios necessários
pub fn write_json<T: Serialize + ?Sized>(path: &Path, valor: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(valor)?)?;
    log_report_written(&path.display().to_string());
    Ok(())
}

/// Carimbo para nomes de arquivo (`2025-01-10T10-30-00`)
pub fn timestamp_arquivo(quando: &DateTime<Local>) -> String {
    quando.format("%Y-%m-%dT%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_write_at_layout() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let quando = Local.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();

        let path = writer
            .write_at(&["departamento", "sucesso"], "12345678000199", &json!({"ok": true}), &quando)
            .unwrap();

        let esperado = dir
            .path()
            .join("odonto/departamento/sucesso/2025/03/07/090501_12345678000199.json");
        assert_eq!(path, esperado);

        let conteudo: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(conteudo, json!({"ok": true}));
    }

    #[test]
    fn test_timestamp_arquivo() {
        let quando = Local.with_ymd_and_hms(2025, 1, 10, 10, 30, 0).unwrap();
        assert_eq!(timestamp_arquivo(&quando), "2025-01-10T10-30-00");
    }
}
