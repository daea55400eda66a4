//! SLA monitoring service for OpsDesk
//!
//! Wires the SLA engine to SQLite storage, an in-app notification sink and
//! a small operational HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod notifier;
pub mod storage;

pub use config::Config;
pub use error::{Result, SlasrvError};
