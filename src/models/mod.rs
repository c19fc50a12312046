pub mod auditoria;
pub mod beneficiario;
pub mod departamento;

pub use auditoria::*;
pub use beneficiario::*;
pub use departamento::*;
