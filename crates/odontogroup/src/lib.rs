//! Cliente da API Odontogroup
//!
//! Cobre os dois serviços usados pela integração:
//!
//! ## APIv3 (Bearer JWT)
//! - **Login**: `GET /login`
//! - **Departamentos**: `GET/POST /departamento`
//! - **Associados**: `GET /associado-Emp`, `POST /AssociadoPJ`
//!
//! ## S4E (token fixo na query string)
//! - **CEP**: `POST /api/redeatendimento/Endereco`
//! - **Dependentes**: `POST /api/vendedor/NovoDependente`
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use odontogroup::OdontogroupClient;
//!
//! #[tokio::main]
//! async fn main() -> odontogroup::Result<()> {
//!     let client = OdontogroupClient::new(std::env::var("ODONTO_BASE_APIV3").unwrap_or_default())?
//!         .with_s4e("https://odontogroup.s4e.com.br", std::env::var("ODONTO_S4E_TOKEN").ok());
//!
//!     let login = client.login("usuario", "senha").await?;
//!     let dep = client.buscar_departamento(&login.token, "12345678000199").await?;
//!     println!("depId = {:?}", dep.dep_id);
//!     Ok(())
//! }
//! ```

pub mod associados;
pub mod auth;
pub mod cep;
pub mod client;
pub mod departamentos;
pub mod error;
pub mod jwt;
pub mod types;

// Re-exports principais
pub use client::{ApiResponse, OdontogroupClient};
pub use error::{OdontogroupError, Result};
pub use types::*;
