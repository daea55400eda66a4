//! Notification sink
//!
//! Writes alert notifications into the web application's notification
//! inbox table. Fan-out to email/chat happens outside this service.

use async_trait::async_trait;
use chrono::Utc;
use opsdesk_model::AlertKind;
use opsdesk_sla::{Notifier, SlaError};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// Notifier that persists messages into the `notifications` table
pub struct StoreNotifier {
    pool: SqlitePool,
}

impl StoreNotifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        kind: AlertKind,
        title: &str,
        message: &str,
    ) -> opsdesk_sla::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, ticket_id, kind, title, message, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(ticket_id.to_string())
        .bind(format!("sla_{}", kind))
        .bind(title)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| SlaError::Notification(e.to_string()))?;

        debug!("Queued {} notification for user {}", kind, user_id);
        Ok(())
    }
}
