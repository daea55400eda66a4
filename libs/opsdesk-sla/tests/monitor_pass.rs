//! Integration tests for the SLA monitor breach-check pass
//!
//! Drives `check_tickets` with a simulated clock against in-memory fakes,
//! covering dedup, per-ticket isolation, dispatch fan-out and the
//! record-then-notify policy.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use opsdesk_model::{AlertKind, SlaAlert, Ticket, TicketPriority, TicketStatus};
use opsdesk_sla::{
    MonitorConfig, Notifier, PriorityHours, Result, SlaError, SlaMonitor, SlaThresholds,
    TicketRepository,
};
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

fn ticket(
    title: &str,
    created_at: DateTime<Utc>,
    sla_target: DateTime<Utc>,
    assignee: Option<Uuid>,
    reporter: Uuid,
) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: title.to_string(),
        status: TicketStatus::Open,
        priority: TicketPriority::High,
        created_at,
        sla_target: Some(sla_target),
        assignee_id: assignee,
        reporter_id: reporter,
    }
}

/// In-memory ticket repository with programmable failure points
#[derive(Default)]
struct FakeRepo {
    tickets: Mutex<Vec<Ticket>>,
    alerts: Mutex<Vec<SlaAlert>>,
    fetch_calls: AtomicUsize,
    /// Fail `alert_exists` for this ticket id
    fail_exists_for: Option<Uuid>,
    /// Fail every `record_alert` call
    fail_record: bool,
    /// `load_thresholds` result; None simulates a config read failure
    thresholds: Option<SlaThresholds>,
}

impl FakeRepo {
    fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets: Mutex::new(tickets),
            thresholds: Some(SlaThresholds::default()),
            ..Default::default()
        }
    }

    fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketRepository for FakeRepo {
    async fn fetch_active_with_deadline(&self) -> Result<Vec<Ticket>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut tickets: Vec<Ticket> = self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_monitorable())
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.sla_target);
        Ok(tickets)
    }

    async fn alert_exists(
        &self,
        ticket_id: Uuid,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        if self.fail_exists_for == Some(ticket_id) {
            return Err(SlaError::Repository("simulated lookup failure".to_string()));
        }
        Ok(self.alerts.lock().unwrap().iter().any(|a| {
            a.ticket_id == ticket_id && a.kind == kind && a.created_at >= since
        }))
    }

    async fn record_alert(&self, alert: &SlaAlert) -> Result<()> {
        if self.fail_record {
            return Err(SlaError::Repository("simulated insert failure".to_string()));
        }
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn load_thresholds(&self) -> Result<SlaThresholds> {
        self.thresholds
            .ok_or_else(|| SlaError::Config("simulated config failure".to_string()))
    }

    async fn load_priority_hours(&self) -> Result<PriorityHours> {
        Ok(PriorityHours::default())
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(Uuid, Uuid, AlertKind)>>,
    fail: bool,
}

impl FakeNotifier {
    fn sent_to(&self, user_id: Uuid) -> usize {
        self.sent.lock().unwrap().iter().filter(|(u, _, _)| *u == user_id).count()
    }

    fn total(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        kind: AlertKind,
        _title: &str,
        _message: &str,
    ) -> Result<()> {
        if self.fail {
            return Err(SlaError::Notification("simulated delivery failure".to_string()));
        }
        self.sent.lock().unwrap().push((user_id, ticket_id, kind));
        Ok(())
    }
}

fn monitor(
    repo: Arc<FakeRepo>,
    notifier: Arc<FakeNotifier>,
) -> Arc<SlaMonitor<FakeRepo, FakeNotifier>> {
    Arc::new(SlaMonitor::new(
        repo,
        notifier,
        MonitorConfig::default(),
        SlaThresholds::default(),
    ))
}

/// P2: a second pass inside the dedup window raises nothing new.
#[tokio::test]
async fn test_dedup_suppresses_second_pass() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let reporter = Uuid::new_v4();
    // 24h allotment, evaluated 25h in -> breach
    let tickets = vec![ticket(
        "db down",
        created,
        created + Duration::hours(24),
        Some(assignee),
        reporter,
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    let now = created + Duration::hours(25);
    let first = monitor.check_tickets(now).await;
    assert_eq!(first.alerts, 1);
    assert_eq!(repo.alert_count(), 1);
    assert_eq!(notifier.total(), 2); // assignee + reporter

    // One hour later, still inside the 24h dedup window
    let second = monitor.check_tickets(now + Duration::hours(1)).await;
    assert_eq!(second.checked, 1);
    assert_eq!(second.alerts, 0);
    assert_eq!(repo.alert_count(), 1, "no duplicate alert record");
    assert_eq!(notifier.total(), 2, "no duplicate notifications");
}

/// After the dedup window expires the same kind may fire again.
#[tokio::test]
async fn test_realert_after_window_expires() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let tickets = vec![ticket(
        "vpn flapping",
        created,
        created + Duration::hours(24),
        Some(assignee),
        Uuid::new_v4(),
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    let breach_time = created + Duration::hours(25);
    monitor.check_tickets(breach_time).await;
    assert_eq!(repo.alert_count(), 1);

    // 25 hours later the first record has aged out of the window
    let summary = monitor.check_tickets(breach_time + Duration::hours(25)).await;
    assert_eq!(summary.alerts, 1);
    assert_eq!(repo.alert_count(), 2);
}

/// P5: one failing ticket does not stop the rest of the pass.
#[tokio::test]
async fn test_per_ticket_isolation() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let poisoned = ticket(
        "poisoned",
        created,
        created + Duration::hours(1), // earliest deadline, evaluated first
        Some(assignee),
        Uuid::new_v4(),
    );
    let healthy = ticket(
        "healthy",
        created,
        created + Duration::hours(24),
        Some(assignee),
        Uuid::new_v4(),
    );
    let poisoned_id = poisoned.id;

    let mut repo = FakeRepo::with_tickets(vec![poisoned, healthy]);
    repo.fail_exists_for = Some(poisoned_id);
    let repo = Arc::new(repo);
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    // Both tickets are past their deadlines
    let summary = monitor.check_tickets(created + Duration::hours(30)).await;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerts, 1, "healthy ticket still alerted");
    assert_eq!(repo.alert_count(), 1);
}

/// Dispatch matrix: breach notifies assignee and reporter independently.
#[tokio::test]
async fn test_breach_notifies_assignee_and_reporter() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let reporter = Uuid::new_v4();
    let tickets = vec![ticket(
        "outage",
        created,
        created + Duration::hours(24),
        Some(assignee),
        reporter,
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(repo, Arc::clone(&notifier));

    monitor.check_tickets(created + Duration::hours(26)).await;
    assert_eq!(notifier.sent_to(assignee), 1);
    assert_eq!(notifier.sent_to(reporter), 1);
}

/// A reporter who is also the assignee gets one message, not two.
#[tokio::test]
async fn test_breach_self_reported_single_notification() {
    let created = t0();
    let user = Uuid::new_v4();
    let tickets = vec![ticket(
        "self-assigned",
        created,
        created + Duration::hours(24),
        Some(user),
        user,
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(repo, Arc::clone(&notifier));

    monitor.check_tickets(created + Duration::hours(26)).await;
    assert_eq!(notifier.total(), 1);
    assert_eq!(notifier.sent_to(user), 1);
}

/// An unassigned breach still reaches the reporter.
#[tokio::test]
async fn test_breach_unassigned_notifies_reporter_only() {
    let created = t0();
    let reporter = Uuid::new_v4();
    let tickets = vec![ticket(
        "orphaned",
        created,
        created + Duration::hours(24),
        None,
        reporter,
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(repo, Arc::clone(&notifier));

    monitor.check_tickets(created + Duration::hours(26)).await;
    assert_eq!(notifier.total(), 1);
    assert_eq!(notifier.sent_to(reporter), 1);
}

/// Warnings go to the assignee only; unassigned warnings go nowhere.
#[tokio::test]
async fn test_warning_dispatch_targets() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let reporter = Uuid::new_v4();
    let assigned = ticket(
        "assigned",
        created,
        created + Duration::hours(24),
        Some(assignee),
        reporter,
    );
    let unassigned = ticket(
        "unassigned",
        created,
        created + Duration::hours(24),
        None,
        reporter,
    );

    let repo = Arc::new(FakeRepo::with_tickets(vec![assigned, unassigned]));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    // 20h of 24h elapsed -> warning for both tickets
    let summary = monitor.check_tickets(created + Duration::hours(20)).await;
    assert_eq!(summary.alerts, 2, "both tickets produce alert records");
    assert_eq!(notifier.sent_to(assignee), 1);
    assert_eq!(notifier.sent_to(reporter), 0);
    assert_eq!(notifier.total(), 1);
}

/// P6: a ticket produces exactly one alert kind per pass.
#[tokio::test]
async fn test_single_kind_per_pass() {
    let created = t0();
    let tickets = vec![ticket(
        "late",
        created,
        created + Duration::hours(24),
        Some(Uuid::new_v4()),
        Uuid::new_v4(),
    )];

    let repo = Arc::new(FakeRepo::with_tickets(tickets));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), notifier);

    // Past the deadline a ticket is over every ratio threshold too; only
    // the breach record may be written.
    monitor.check_tickets(created + Duration::hours(30)).await;
    let alerts = repo.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Breach);
}

/// Record-then-notify policy: a failed insert does not block delivery.
#[tokio::test]
async fn test_persistence_failure_still_notifies() {
    let created = t0();
    let assignee = Uuid::new_v4();
    let mut repo = FakeRepo::with_tickets(vec![ticket(
        "flaky store",
        created,
        created + Duration::hours(24),
        Some(assignee),
        Uuid::new_v4(),
    )]);
    repo.fail_record = true;
    let repo = Arc::new(repo);
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    let summary = monitor.check_tickets(created + Duration::hours(20)).await;
    assert_eq!(repo.alert_count(), 0);
    assert_eq!(summary.alerts, 1);
    assert_eq!(notifier.sent_to(assignee), 1, "delivery attempted despite failed insert");
}

/// Notification failures are swallowed; the alert record still lands.
#[tokio::test]
async fn test_delivery_failure_does_not_fail_pass() {
    let created = t0();
    let repo = Arc::new(FakeRepo::with_tickets(vec![ticket(
        "dead letter",
        created,
        created + Duration::hours(24),
        Some(Uuid::new_v4()),
        Uuid::new_v4(),
    )]));
    let notifier = Arc::new(FakeNotifier {
        fail: true,
        ..Default::default()
    });
    let monitor = monitor(Arc::clone(&repo), notifier);

    let summary = monitor.check_tickets(created + Duration::hours(26)).await;
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.alerts, 1);
    assert_eq!(summary.notified, 0);
    assert_eq!(repo.alert_count(), 1);
}

/// Tickets well inside their allotment produce nothing.
#[tokio::test]
async fn test_ok_ticket_untouched() {
    let created = t0();
    let repo = Arc::new(FakeRepo::with_tickets(vec![ticket(
        "fresh",
        created,
        created + Duration::hours(24),
        Some(Uuid::new_v4()),
        Uuid::new_v4(),
    )]));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = monitor(Arc::clone(&repo), Arc::clone(&notifier));

    let summary = monitor.check_tickets(created + Duration::hours(2)).await;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.alerts, 0);
    assert_eq!(repo.alert_count(), 0);
    assert_eq!(notifier.total(), 0);
}

/// Double start is a no-op: only one timer drives passes.
#[tokio::test]
async fn test_start_twice_single_timer() {
    let repo = Arc::new(FakeRepo::with_tickets(Vec::new()));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = Arc::new(SlaMonitor::new(
        Arc::clone(&repo),
        notifier,
        MonitorConfig {
            poll_interval: StdDuration::from_millis(100),
            dedup_window_hours: 24,
        },
        SlaThresholds::default(),
    ));

    monitor.start().await.unwrap();
    monitor.start().await.unwrap();
    assert!(monitor.is_running());

    tokio::time::sleep(StdDuration::from_millis(350)).await;
    let fetches = repo.fetch_calls.load(Ordering::SeqCst);
    // A single 100ms timer fires ~3 times in 350ms; a duplicate timer
    // would roughly double that.
    assert!((2..=4).contains(&fetches), "unexpected fetch count {}", fetches);

    monitor.stop();
    monitor.stop(); // idempotent
    tokio::time::sleep(StdDuration::from_millis(150)).await;
    assert!(!monitor.is_running());

    let after_stop = repo.fetch_calls.load(Ordering::SeqCst);
    tokio::time::sleep(StdDuration::from_millis(250)).await;
    assert_eq!(
        repo.fetch_calls.load(Ordering::SeqCst),
        after_stop,
        "no passes after stop"
    );
}

/// Stop before start is safe, and the monitor can be restarted.
#[tokio::test]
async fn test_stop_when_stopped_and_restart() {
    let repo = Arc::new(FakeRepo::with_tickets(Vec::new()));
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = Arc::new(SlaMonitor::new(
        Arc::clone(&repo),
        notifier,
        MonitorConfig {
            poll_interval: StdDuration::from_millis(50),
            dedup_window_hours: 24,
        },
        SlaThresholds::default(),
    ));

    monitor.stop(); // no-op
    assert!(!monitor.is_running());

    monitor.start().await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(120)).await;
    monitor.stop();
    tokio::time::sleep(StdDuration::from_millis(100)).await;
    assert!(!monitor.is_running());

    // A stale stop must not poison the next start
    monitor.start().await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(120)).await;
    assert!(monitor.is_running());
    let fetches = repo.fetch_calls.load(Ordering::SeqCst);
    assert!(fetches >= 3, "restarted monitor keeps ticking (got {})", fetches);
    monitor.stop();
}

/// A threshold config failure at start falls back to the initial values.
#[tokio::test]
async fn test_threshold_load_failure_uses_defaults() {
    let created = t0();
    let mut repo = FakeRepo::with_tickets(vec![ticket(
        "config-less",
        created,
        created + Duration::hours(24),
        Some(Uuid::new_v4()),
        Uuid::new_v4(),
    )]);
    repo.thresholds = None; // load_thresholds errors
    let repo = Arc::new(repo);
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = Arc::new(SlaMonitor::new(
        Arc::clone(&repo),
        notifier,
        MonitorConfig {
            poll_interval: StdDuration::from_secs(3600),
            dedup_window_hours: 24,
        },
        SlaThresholds::default(),
    ));

    monitor.start().await.unwrap();

    let status = monitor.status().await;
    assert_eq!(status.warning_ratio, 0.8);
    assert_eq!(status.critical_ratio, 0.95);

    // Default thresholds still classify: 20/24h -> warning
    let summary = monitor.check_tickets(created + Duration::hours(20)).await;
    assert_eq!(summary.alerts, 1);
    monitor.stop();
}

/// Custom persisted thresholds are picked up at start.
#[tokio::test]
async fn test_thresholds_loaded_from_repository() {
    let created = t0();
    let mut repo = FakeRepo::with_tickets(vec![ticket(
        "tuned",
        created,
        created + Duration::hours(24),
        Some(Uuid::new_v4()),
        Uuid::new_v4(),
    )]);
    repo.thresholds = Some(SlaThresholds {
        warning_ratio: 0.5,
        critical_ratio: 0.9,
    });
    let repo = Arc::new(repo);
    let notifier = Arc::new(FakeNotifier::default());
    let monitor = Arc::new(SlaMonitor::new(
        Arc::clone(&repo),
        notifier,
        MonitorConfig {
            poll_interval: StdDuration::from_secs(3600),
            dedup_window_hours: 24,
        },
        SlaThresholds::default(),
    ));

    monitor.start().await.unwrap();

    // 13h of 24h elapsed (ratio 0.54): warning under the loaded 0.5
    // threshold, nothing under the default 0.8.
    let summary = monitor.check_tickets(created + Duration::hours(13)).await;
    assert_eq!(summary.alerts, 1);
    let alerts = repo.alerts.lock().unwrap();
    assert_eq!(alerts[0].kind, AlertKind::Warning);
    drop(alerts);
    monitor.stop();
}
