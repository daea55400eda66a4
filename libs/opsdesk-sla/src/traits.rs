//! External collaborator traits
//!
//! The engine only ever talks to the surrounding application through these
//! two seams: a ticket repository for reads and alert records, and a
//! notifier for delivery. Services provide the concrete implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsdesk_model::{AlertKind, SlaAlert, Ticket};
use uuid::Uuid;

use crate::config::{PriorityHours, SlaThresholds};
use crate::error::Result;

/// Read access to tickets and read/write access to SLA alert records
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Active tickets (not resolved/closed) with a non-null deadline,
    /// ordered by ascending deadline.
    async fn fetch_active_with_deadline(&self) -> Result<Vec<Ticket>>;

    /// Whether an alert of `kind` for `ticket_id` was recorded at or after
    /// `since` (the monitor passes `now - dedup_window`).
    async fn alert_exists(&self, ticket_id: Uuid, kind: AlertKind, since: DateTime<Utc>)
        -> Result<bool>;

    /// Persist one alert record. Callers tolerate duplicate writes for the
    /// same key; overlapping passes make them possible.
    async fn record_alert(&self, alert: &SlaAlert) -> Result<()>;

    /// Persisted threshold configuration. Errors make the caller fall back
    /// to compiled-in defaults.
    async fn load_thresholds(&self) -> Result<SlaThresholds>;

    /// Persisted per-priority resolution hours. Same fallback contract as
    /// `load_thresholds`.
    async fn load_priority_hours(&self) -> Result<PriorityHours>;
}

/// Best-effort notification delivery.
///
/// The engine logs and swallows every error from `notify`; implementations
/// should not retry on its behalf.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        kind: AlertKind,
        title: &str,
        message: &str,
    ) -> Result<()>;
}
