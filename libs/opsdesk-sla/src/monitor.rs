//! SLA Monitor - periodic breach checking
//!
//! Runs the breach-check pass on a fixed cadence. Each tick spawns the pass
//! as its own task, so a pass that outruns the interval overlaps the next
//! one; correctness rests on the content-keyed alert dedup, not on pass
//! exclusivity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use opsdesk_model::{SlaAlert, SlaState, Ticket};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::config::{MonitorConfig, SlaThresholds};
use crate::error::Result;
use crate::notify;
use crate::traits::{Notifier, TicketRepository};

/// Outcome counters for one breach-check pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct PassSummary {
    /// Tickets fetched for evaluation
    pub checked: usize,
    /// New alert records raised (post-dedup)
    pub alerts: usize,
    /// Notifications successfully delivered
    pub notified: usize,
    /// Tickets skipped because their evaluation failed
    pub failed: usize,
}

/// Monitor status snapshot for the service API
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub poll_interval_ms: u64,
    pub warning_ratio: f64,
    pub critical_ratio: f64,
}

/// Periodic SLA monitor over a ticket repository and a notifier.
///
/// Constructed once at process start and shared behind an `Arc`; the
/// running flag and loaded thresholds are the only mutable state.
pub struct SlaMonitor<R: TicketRepository + ?Sized, N: Notifier + ?Sized> {
    repo: Arc<R>,
    notifier: Arc<N>,
    config: MonitorConfig,
    /// Thresholds in effect; replaced from persisted config at start
    thresholds: RwLock<SlaThresholds>,
    running: AtomicBool,
    /// Cancels the timer loop; a fresh token is issued per start
    shutdown: Mutex<CancellationToken>,
}

impl<R, N> SlaMonitor<R, N>
where
    R: TicketRepository + ?Sized + 'static,
    N: Notifier + ?Sized + 'static,
{
    pub fn new(
        repo: Arc<R>,
        notifier: Arc<N>,
        config: MonitorConfig,
        initial_thresholds: SlaThresholds,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
            thresholds: RwLock::new(initial_thresholds),
            running: AtomicBool::new(false),
            shutdown: Mutex::new(CancellationToken::new()),
        }
    }

    /// Start the periodic monitor. No-op when already running.
    ///
    /// Threshold configuration is reloaded from the repository; a load
    /// failure falls back to the thresholds already in effect and is never
    /// propagated. An error return means no monitoring loop was started.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("SLA monitor already running");
            return Ok(());
        }

        match self.repo.load_thresholds().await {
            Ok(thresholds) => {
                *self.thresholds.write().await = thresholds;
                debug!(
                    "Loaded SLA thresholds: warning={} critical={}",
                    thresholds.warning_ratio, thresholds.critical_ratio
                );
            },
            Err(e) => {
                warn!("Failed to load SLA thresholds, keeping defaults: {}", e);
            },
        }

        let token = CancellationToken::new();
        match self.shutdown.lock() {
            Ok(mut slot) => *slot = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.run_loop(token).await;
        });

        info!(
            "SLA monitor started, poll interval {}ms",
            self.config.poll_interval.as_millis()
        );
        Ok(())
    }

    /// Stop scheduling future passes. In-flight passes run to completion.
    /// Safe to call when not running.
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            debug!("SLA monitor already stopped");
            return;
        }
        info!("Stopping SLA monitor");
        match self.shutdown.lock() {
            Ok(slot) => slot.cancel(),
            Err(poisoned) => poisoned.into_inner().cancel(),
        }
    }

    /// Whether the timer loop is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Status snapshot for the service API
    pub async fn status(&self) -> MonitorStatus {
        let thresholds = *self.thresholds.read().await;
        MonitorStatus {
            running: self.is_running(),
            poll_interval_ms: self.config.poll_interval.as_millis() as u64,
            warning_ratio: thresholds.warning_ratio,
            critical_ratio: thresholds.critical_ratio,
        }
    }

    /// Timer loop: one pass per tick, spawned so slow passes never delay
    /// the cadence.
    async fn run_loop(self: Arc<Self>, token: CancellationToken) {
        let mut tick_interval = interval(self.config.poll_interval);
        // The first interval tick fires immediately; consume it so the
        // first pass happens one full interval after start.
        tick_interval.tick().await;

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let monitor = Arc::clone(&self);
                    tokio::spawn(async move {
                        let summary = monitor.run_pass().await;
                        debug!(
                            "SLA pass complete: checked={} alerts={} notified={} failed={}",
                            summary.checked, summary.alerts, summary.notified, summary.failed
                        );
                    });
                }
                _ = token.cancelled() => {
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("SLA monitor stopped");
    }

    /// One full breach-check pass against the current wall clock.
    pub async fn run_pass(&self) -> PassSummary {
        self.check_tickets(Utc::now()).await
    }

    /// One full breach-check pass, with every ticket judged against the
    /// same `now`. Exposed so tests can drive simulated clocks.
    pub async fn check_tickets(&self, now: DateTime<Utc>) -> PassSummary {
        let mut summary = PassSummary::default();

        let tickets = match self.repo.fetch_active_with_deadline().await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!("SLA pass aborted, ticket fetch failed: {}", e);
                summary.failed += 1;
                return summary;
            },
        };

        summary.checked = tickets.len();
        let thresholds = *self.thresholds.read().await;

        for ticket in &tickets {
            match self.evaluate_ticket(ticket, now, &thresholds).await {
                Ok(Some(notified)) => {
                    summary.alerts += 1;
                    summary.notified += notified;
                },
                Ok(None) => {},
                Err(e) => {
                    // Per-ticket isolation: log and keep sweeping
                    error!("SLA evaluation failed for ticket {}: {}", ticket.id, e);
                    summary.failed += 1;
                },
            }
        }

        summary
    }

    /// Evaluate one ticket: classify, dedup, record, notify.
    ///
    /// Returns the delivered-notification count when a new alert was
    /// raised, `None` when nothing was due or a recent alert suppressed it.
    async fn evaluate_ticket(
        &self,
        ticket: &Ticket,
        now: DateTime<Utc>,
        thresholds: &SlaThresholds,
    ) -> Result<Option<usize>> {
        let Some(sla_target) = ticket.sla_target else {
            // Repository contract excludes these; skip defensively
            return Ok(None);
        };

        let Some(state) = classify(ticket.created_at, sla_target, now, thresholds) else {
            return Ok(None);
        };

        let kind = state.kind();
        let since = now - Duration::hours(self.config.dedup_window_hours);
        if self.repo.alert_exists(ticket.id, kind, since).await? {
            debug!(
                "Suppressing duplicate {} alert for ticket {} (within dedup window)",
                kind, ticket.id
            );
            return Ok(None);
        }

        let alert = SlaAlert::new(ticket.id, kind, alert_details(&state, sla_target), now);

        // Recording and delivery are independent best-effort steps: a
        // failed insert is logged and delivery is still attempted.
        if let Err(e) = self.repo.record_alert(&alert).await {
            error!("Failed to record {} alert for ticket {}: {}", kind, ticket.id, e);
        }

        let notified = notify::dispatch(self.notifier.as_ref(), ticket, &state).await;
        info!(
            "SLA {} raised for ticket {} '{}' ({} notification(s) delivered)",
            kind, ticket.id, ticket.title, notified
        );

        Ok(Some(notified))
    }
}

fn alert_details(state: &SlaState, sla_target: DateTime<Utc>) -> serde_json::Value {
    match state {
        SlaState::Warning { hours_remaining } | SlaState::Critical { hours_remaining } => json!({
            "hours_remaining": hours_remaining,
            "sla_target": sla_target,
        }),
        SlaState::Breach { hours_overdue } => json!({
            "hours_overdue": hours_overdue,
            "sla_target": sla_target,
        }),
    }
}
