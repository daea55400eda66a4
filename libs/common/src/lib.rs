//! Common utilities shared by OpsDesk services
//!
//! Provides the two pieces of plumbing every service needs:
//! - `config_loader`: layered configuration (defaults -> environment -> YAML)
//! - `logging`: tracing subscriber bootstrap with optional file output

pub mod config_loader;
pub mod logging;

pub use config_loader::{ConfigError, ConfigLoader};
pub use logging::{init_logging, LogConfig};
