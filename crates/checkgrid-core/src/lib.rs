//! checkgrid-core — catalog types, kwargs resolution, and configuration.

pub mod config;
pub mod error;
pub mod kwargs;
pub mod types;

pub use config::CheckGridConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
