pub mod beneficiario_sync;
pub mod cpf_check;
pub mod departamentos;
pub mod inclusao;
pub mod payload_builder;
pub mod report;
pub mod token_service;

pub use beneficiario_sync::{BeneficiarioSync, ModoEnvio, ResumoEnvio};
pub use cpf_check::CpfCheckService;
pub use departamentos::DepartamentoService;
pub use inclusao::InclusaoService;
pub use payload_builder::PayloadBuilder;
pub use report::ReportWriter;
pub use token_service::TokenService;
