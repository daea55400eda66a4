//! SQLite ticket store
//!
//! Implements the engine's `TicketRepository` over the web application's
//! ticket tables. Tickets are read-only here; this service only ever
//! writes `sla_alerts` rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsdesk_model::{AlertKind, SlaAlert, Ticket, TicketPriority, TicketStatus};
use opsdesk_sla::{PriorityHours, SlaError, SlaThresholds, TicketRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Prefix for per-priority resolution-hour keys in `sla_configs`
const RESOLUTION_HOURS_PREFIX: &str = "resolution_hours.";

/// SQLite-backed ticket repository
pub struct SqliteTicketStore {
    pool: SqlitePool,
}

impl SqliteTicketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Create the tables this service reads and writes.
///
/// `tickets` mirrors the columns the web application maintains;
/// `sla_alerts`, `sla_configs` and `notifications` are owned here.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tickets (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            priority TEXT NOT NULL DEFAULT 'medium',
            created_at TEXT NOT NULL,
            sla_target TEXT,
            assignee_id TEXT,
            reporter_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sla_alerts (
            id TEXT PRIMARY KEY,
            ticket_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sla_alerts_dedup
        ON sla_alerts (ticket_id, kind, created_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sla_configs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            ticket_id TEXT,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or replace one `sla_configs` row
pub async fn upsert_config(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sla_configs (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl TicketRepository for SqliteTicketStore {
    async fn fetch_active_with_deadline(&self) -> opsdesk_sla::Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, status, priority, created_at, sla_target,
                   assignee_id, reporter_id
            FROM tickets
            WHERE status NOT IN ('resolved', 'closed')
              AND sla_target IS NOT NULL
            ORDER BY sla_target ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut tickets = Vec::with_capacity(rows.len());
        for row in rows {
            tickets.push(hydrate_ticket(row)?);
        }
        Ok(tickets)
    }

    async fn alert_exists(
        &self,
        ticket_id: Uuid,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> opsdesk_sla::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(1)
            FROM sla_alerts
            WHERE ticket_id = ? AND kind = ? AND created_at >= ?
            "#,
        )
        .bind(ticket_id.to_string())
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(count > 0)
    }

    async fn record_alert(&self, alert: &SlaAlert) -> opsdesk_sla::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sla_alerts (id, ticket_id, kind, details, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(alert.ticket_id.to_string())
        .bind(alert.kind.as_str())
        .bind(alert.details.to_string())
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn load_thresholds(&self) -> opsdesk_sla::Result<SlaThresholds> {
        let rows = sqlx::query(
            r#"
            SELECT key, value FROM sla_configs
            WHERE key IN ('warning_ratio', 'critical_ratio')
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut thresholds = SlaThresholds::default();
        for row in rows {
            let key: String = row.try_get("key").map_err(db_err)?;
            let value: String = row.try_get("value").map_err(db_err)?;
            let ratio: f64 = value.parse().map_err(|_| {
                SlaError::Config(format!("invalid ratio for {}: {}", key, value))
            })?;
            match key.as_str() {
                "warning_ratio" => thresholds.warning_ratio = ratio,
                "critical_ratio" => thresholds.critical_ratio = ratio,
                _ => {},
            }
        }
        Ok(thresholds)
    }

    async fn load_priority_hours(&self) -> opsdesk_sla::Result<PriorityHours> {
        let rows = sqlx::query(
            r#"
            SELECT key, value FROM sla_configs
            WHERE key LIKE 'resolution_hours.%'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut hours = PriorityHours::default();
        for row in rows {
            let key: String = row.try_get("key").map_err(db_err)?;
            let value: String = row.try_get("value").map_err(db_err)?;

            let Some(priority) = key
                .strip_prefix(RESOLUTION_HOURS_PREFIX)
                .and_then(TicketPriority::from_code)
            else {
                // Unknown priority codes are ignored, not fatal
                continue;
            };
            let parsed: u32 = value.parse().map_err(|_| {
                SlaError::Config(format!("invalid hours for {}: {}", key, value))
            })?;
            hours.set(priority, parsed);
        }
        Ok(hours)
    }
}

/// Hydrate a ticket row
fn hydrate_ticket(row: SqliteRow) -> opsdesk_sla::Result<Ticket> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let title: String = row.try_get("title").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    let priority: String = row.try_get("priority").map_err(db_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(db_err)?;
    let sla_target: Option<DateTime<Utc>> = row.try_get("sla_target").map_err(db_err)?;
    let assignee_id: Option<String> = row.try_get("assignee_id").map_err(db_err)?;
    let reporter_id: String = row.try_get("reporter_id").map_err(db_err)?;

    Ok(Ticket {
        id: parse_uuid("id", &id)?,
        title,
        status: TicketStatus::from_code(&status)
            .ok_or_else(|| SlaError::Repository(format!("unknown ticket status: {}", status)))?,
        priority: TicketPriority::from_code(&priority)
            .ok_or_else(|| SlaError::Repository(format!("unknown ticket priority: {}", priority)))?,
        created_at,
        sla_target,
        assignee_id: assignee_id
            .map(|id| parse_uuid("assignee_id", &id))
            .transpose()?,
        reporter_id: parse_uuid("reporter_id", &reporter_id)?,
    })
}

fn parse_uuid(column: &str, value: &str) -> opsdesk_sla::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| SlaError::Repository(format!("invalid uuid in {}: {}", column, e)))
}

fn db_err(err: sqlx::Error) -> SlaError {
    SlaError::Repository(err.to_string())
}
