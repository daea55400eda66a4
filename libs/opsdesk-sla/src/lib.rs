//! OpsDesk SLA Engine
//!
//! Periodic SLA monitoring for tickets:
//! - Breach classification against warning/critical/breach thresholds
//! - Deduplicated alert recording and best-effort notification dispatch
//! - Business-hours-aware deadline computation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │   Monitor   │────▶│  Classifier  │     │ TicketRepository │
//! │  (15 min)   │     │   (pure)     │◀────│    (tickets)     │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//!        │                                          ▲
//!        ▼                                          │ alerts
//! ┌─────────────┐     ┌──────────────┐              │
//! │  Dispatch   │────▶│   Notifier   │──────────────┘
//! │ (dedup'd)   │     │ (best-effort)│
//! └─────────────┘     └──────────────┘
//! ```

mod classify;
pub mod config;
mod deadline;
mod error;
mod monitor;
mod notify;
mod traits;

// Re-export public API
pub use classify::classify;
pub use config::{
    MonitorConfig, PriorityHours, SlaThresholds, DEFAULT_CRITICAL_RATIO,
    DEFAULT_DEDUP_WINDOW_HOURS, DEFAULT_POLL_INTERVAL, DEFAULT_WARNING_RATIO,
};
pub use deadline::SlaCalculator;
pub use error::{Result, SlaError};
pub use monitor::{MonitorStatus, PassSummary, SlaMonitor};
pub use traits::{Notifier, TicketRepository};
