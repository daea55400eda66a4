//! SLA deadline computation
//!
//! Produces an absolute deadline from "now" for a given priority, either in
//! plain wall-clock hours or by walking forward through business hours
//! (09:00-17:00, Monday-Friday, no holiday calendar).

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use opsdesk_model::TicketPriority;
use tracing::warn;

use crate::config::PriorityHours;

/// Business window start hour (inclusive)
const BUSINESS_START_HOUR: u32 = 9;

/// Business window end hour (exclusive)
const BUSINESS_END_HOUR: u32 = 17;

/// Upper bound on walk iterations; hit only on absurd inputs
const MAX_WALK_DAYS: u32 = 10_000;

/// Deadline calculator holding the per-priority resolution hours.
#[derive(Debug, Clone, Default)]
pub struct SlaCalculator {
    hours: PriorityHours,
}

impl SlaCalculator {
    pub fn new(hours: PriorityHours) -> Self {
        Self { hours }
    }

    /// Resolution hours configured for a priority
    pub fn hours_for(&self, priority: TicketPriority) -> u32 {
        self.hours.hours_for(priority)
    }

    /// Absolute deadline for a ticket of `priority` opened at `now`.
    ///
    /// Never fails: if the business-hours walk cannot produce a timestamp,
    /// the fallback is a flat 24 wall-clock hours, logged at warn level.
    pub fn sla_target(
        &self,
        now: DateTime<Utc>,
        priority: TicketPriority,
        business_hours_only: bool,
    ) -> DateTime<Utc> {
        let hours = self.hours.hours_for(priority);
        if !business_hours_only {
            return now + Duration::hours(i64::from(hours));
        }
        self.business_hours_target(now, f64::from(hours))
    }

    /// Deadline `hours` business hours after `now`.
    ///
    /// Same fallback contract as `sla_target`.
    pub fn business_hours_target(&self, now: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
        match walk_business_hours(now, hours) {
            Some(target) => target,
            None => {
                warn!(
                    "Business-hours deadline computation failed for {} hours from {}, \
                     falling back to 24 wall-clock hours",
                    hours, now
                );
                now + Duration::hours(24)
            },
        }
    }
}

/// Walk forward from `start`, consuming only time inside the business
/// window, until `hours` of business time have elapsed.
fn walk_business_hours(start: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }

    let mut cursor = start;
    let mut remaining = hours;

    for _ in 0..MAX_WALK_DAYS {
        if is_weekend(cursor) {
            cursor = next_day_open(cursor)?;
            continue;
        }

        let open = at_hour(cursor, BUSINESS_START_HOUR)?;
        let close = at_hour(cursor, BUSINESS_END_HOUR)?;

        if cursor < open {
            cursor = open;
            continue;
        }
        if cursor >= close {
            cursor = next_day_open(cursor)?;
            continue;
        }

        // Inside the window: either finish today or consume the rest of it
        let available = duration_hours(close - cursor);
        if remaining <= available {
            return Some(cursor + hours_duration(remaining));
        }
        remaining -= available;
        cursor = next_day_open(cursor)?;
    }

    None
}

fn is_weekend(t: DateTime<Utc>) -> bool {
    matches!(t.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Same calendar day at `hour`:00:00
fn at_hour(t: DateTime<Utc>, hour: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    match Utc.from_local_datetime(&t.date_naive().and_time(time)) {
        chrono::LocalResult::Single(dt) => Some(dt),
        _ => None,
    }
}

/// Next calendar day at the window start
fn next_day_open(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at_hour(t + Duration::days(1), BUSINESS_START_HOUR)
}

fn duration_hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

fn hours_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}
