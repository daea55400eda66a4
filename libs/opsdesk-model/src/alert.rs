//! SLA alert records and classification outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AlertKind;

/// Immutable log entry recording that a ticket crossed an SLA threshold.
///
/// Written once per (ticket, kind) per dedup window and never updated;
/// retention/cleanup is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaAlert {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub kind: AlertKind,
    /// Snapshot payload: hours remaining/overdue and the deadline
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SlaAlert {
    /// Create a new alert record stamped at `at` (the pass timestamp, so
    /// every alert from one pass carries the same instant).
    pub fn new(ticket_id: Uuid, kind: AlertKind, details: serde_json::Value, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id,
            kind,
            details,
            created_at: at,
        }
    }
}

/// Outcome of classifying a ticket against its SLA deadline.
///
/// Variants are mutually exclusive; a ticket is in exactly one state per
/// evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlaState {
    /// Warning threshold crossed, deadline still ahead
    Warning { hours_remaining: f64 },
    /// Critical threshold crossed, deadline still ahead
    Critical { hours_remaining: f64 },
    /// Deadline passed while the ticket was still active
    Breach { hours_overdue: f64 },
}

impl SlaState {
    /// The alert kind this state maps to
    pub fn kind(&self) -> AlertKind {
        match self {
            SlaState::Warning { .. } => AlertKind::Warning,
            SlaState::Critical { .. } => AlertKind::Critical,
            SlaState::Breach { .. } => AlertKind::Breach,
        }
    }
}
