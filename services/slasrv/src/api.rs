//! HTTP API for the SLA monitor
//!
//! Small operational surface: health, monitor lifecycle, one-shot checks
//! and deadline preview for the ticket-creation flow.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use opsdesk_model::TicketPriority;
use opsdesk_sla::{SlaCalculator, SlaMonitor};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::notifier::StoreNotifier;
use crate::storage::SqliteTicketStore;

/// Shared handler state
pub struct AppState {
    pub monitor: Arc<SlaMonitor<SqliteTicketStore, StoreNotifier>>,
    pub calculator: SlaCalculator,
    /// Default business-hours mode for deadline previews
    pub business_hours_only: bool,
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sla/status", get(sla_status))
        .route("/api/sla/monitor/start", post(monitor_start))
        .route("/api/sla/monitor/stop", post(monitor_stop))
        .route("/api/sla/check", post(run_check))
        .route("/api/sla/target", get(sla_target))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health Check ===

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "slasrv",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// === Monitor Lifecycle ===

async fn sla_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.monitor.status().await;
    Json(json!(status))
}

async fn monitor_start(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.monitor.start().await {
        Ok(()) => Json(json!({ "running": true })),
        Err(e) => {
            error!("Failed to start monitor: {}", e);
            Json(json!({ "error": "Failed to start monitor" }))
        },
    }
}

async fn monitor_stop(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.monitor.stop();
    Json(json!({ "running": false }))
}

/// Run one immediate breach-check pass and return its summary
async fn run_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let summary = state.monitor.run_pass().await;
    Json(json!(summary))
}

// === Deadline Preview ===

#[derive(Debug, Deserialize)]
struct TargetQuery {
    priority: String,
    /// Overrides the configured business-hours mode when present
    business_hours: Option<bool>,
}

async fn sla_target(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TargetQuery>,
) -> Json<serde_json::Value> {
    let Some(priority) = TicketPriority::from_code(&query.priority) else {
        return Json(json!({ "error": format!("Unknown priority: {}", query.priority) }));
    };

    let business_hours = query.business_hours.unwrap_or(state.business_hours_only);
    let now = Utc::now();
    let target = state.calculator.sla_target(now, priority, business_hours);

    Json(json!({
        "priority": priority,
        "business_hours": business_hours,
        "resolution_hours": state.calculator.hours_for(priority),
        "sla_target": target.to_rfc3339(),
    }))
}
