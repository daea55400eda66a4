//! Breach classification
//!
//! Pure arithmetic over (created_at, sla_target, now). All tickets in one
//! pass are judged against the same captured instant.

use chrono::{DateTime, Duration, Utc};
use opsdesk_model::SlaState;

use crate::config::SlaThresholds;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Classify a ticket's SLA state at `now`.
///
/// Checked in precedence order, first match wins:
/// 1. deadline passed -> breach
/// 2. deadline at/before creation (malformed allotment) -> breach
/// 3. elapsed ratio >= critical -> critical
/// 4. elapsed ratio >= warning -> warning
///
/// Returns `None` while the ticket is comfortably within its allotment.
pub fn classify(
    created_at: DateTime<Utc>,
    sla_target: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &SlaThresholds,
) -> Option<SlaState> {
    let remaining = sla_target - now;
    if remaining < Duration::zero() {
        return Some(SlaState::Breach {
            hours_overdue: hours(now - sla_target),
        });
    }

    let total_allotted = sla_target - created_at;
    if total_allotted <= Duration::zero() {
        // Deadline at or before creation: the allotment was consumed before
        // it existed. Treat as already breached rather than dividing by a
        // non-positive span.
        return Some(SlaState::Breach { hours_overdue: 0.0 });
    }

    let elapsed = now - created_at;
    let ratio = duration_millis(elapsed) / duration_millis(total_allotted);

    if ratio >= thresholds.critical_ratio {
        Some(SlaState::Critical {
            hours_remaining: hours(remaining),
        })
    } else if ratio >= thresholds.warning_ratio {
        Some(SlaState::Warning {
            hours_remaining: hours(remaining),
        })
    } else {
        None
    }
}

fn duration_millis(d: Duration) -> f64 {
    d.num_milliseconds() as f64
}

fn hours(d: Duration) -> f64 {
    duration_millis(d) / MILLIS_PER_HOUR
}
