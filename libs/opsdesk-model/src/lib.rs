//! Core domain types for OpsDesk
//!
//! Shared between the SLA engine and the services that persist tickets.

mod alert;
mod ticket;
mod types;

pub use alert::{SlaAlert, SlaState};
pub use ticket::Ticket;
pub use types::{AlertKind, TicketPriority, TicketStatus};
