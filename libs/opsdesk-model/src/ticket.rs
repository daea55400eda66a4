//! Ticket record as read from the ticket store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{TicketPriority, TicketStatus};

/// A support ticket.
///
/// The SLA engine treats this as read-only: it never mutates a ticket, it
/// only classifies it against its deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    /// Short summary, used in notification text
    pub title: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    /// Resolution deadline; tickets without one are not monitored
    pub sla_target: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub reporter_id: Uuid,
}

impl Ticket {
    /// Whether this ticket is eligible for SLA evaluation
    pub fn is_monitorable(&self) -> bool {
        self.status.is_active() && self.sla_target.is_some()
    }
}
