//! SLA engine configuration
//!
//! Thresholds and per-priority resolution hours may be overridden by
//! persisted configuration; the constants here are the fallbacks when no
//! override exists or the configuration source is unavailable.

use std::collections::HashMap;
use std::time::Duration;

use opsdesk_model::TicketPriority;
use serde::{Deserialize, Serialize};

/// Default warning threshold: 80% of allotted time elapsed
pub const DEFAULT_WARNING_RATIO: f64 = 0.8;

/// Default critical threshold: 95% of allotted time elapsed
pub const DEFAULT_CRITICAL_RATIO: f64 = 0.95;

/// Default poll interval between breach-check passes (15 minutes)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(900_000);

/// Default dedup window: a (ticket, kind) alert is suppressed for 24 hours
pub const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;

/// Elapsed-ratio thresholds that trigger warning/critical classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaThresholds {
    /// Fraction of allotted time elapsed that triggers a warning
    pub warning_ratio: f64,
    /// Fraction of allotted time elapsed that triggers a critical alert
    pub critical_ratio: f64,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            warning_ratio: DEFAULT_WARNING_RATIO,
            critical_ratio: DEFAULT_CRITICAL_RATIO,
        }
    }
}

/// Per-priority resolution time in hours.
///
/// Priorities absent from the loaded map fall back to the compiled-in
/// defaults: critical=4h, high=24h, medium=72h, low=120h.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityHours {
    overrides: HashMap<TicketPriority, u32>,
}

impl PriorityHours {
    /// Compiled-in default resolution hours for a priority
    pub fn default_hours(priority: TicketPriority) -> u32 {
        match priority {
            TicketPriority::Critical => 4,
            TicketPriority::High => 24,
            TicketPriority::Medium => 72,
            TicketPriority::Low => 120,
        }
    }

    /// Build from explicit overrides
    pub fn with_overrides(overrides: HashMap<TicketPriority, u32>) -> Self {
        Self { overrides }
    }

    /// Set the resolution hours for one priority
    pub fn set(&mut self, priority: TicketPriority, hours: u32) {
        self.overrides.insert(priority, hours);
    }

    /// Resolution hours for a priority, falling back to the default
    pub fn hours_for(&self, priority: TicketPriority) -> u32 {
        self.overrides
            .get(&priority)
            .copied()
            .unwrap_or_else(|| Self::default_hours(priority))
    }

    /// Overlay another set of overrides on top of this one
    pub fn merge_from(&mut self, other: &PriorityHours) {
        for (priority, hours) in &other.overrides {
            self.overrides.insert(*priority, *hours);
        }
    }
}

/// Monitor scheduling configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between breach-check passes
    pub poll_interval: Duration,
    /// Rolling window within which a (ticket, kind) alert is not re-raised
    pub dedup_window_hours: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            dedup_window_hours: DEFAULT_DEDUP_WINDOW_HOURS,
        }
    }
}
