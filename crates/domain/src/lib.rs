//! dohproxy domain layer
pub mod config;
pub mod errors;
pub mod network;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use network::{is_private_ip, resolve_public_addr};
