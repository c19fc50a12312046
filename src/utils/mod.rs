pub mod error;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use string_utils::{non_empty, only_digits, truncate_chars};
