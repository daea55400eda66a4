//! Ticket status, priority and alert-kind enumerations
//!
//! String codes match the columns the web application writes, so the SLA
//! engine can read ticket rows without translation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Database string code
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Parse a database string code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// Whether a ticket in this status is still eligible for SLA evaluation
    pub fn is_active(&self) -> bool {
        !matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    /// All priorities, ascending urgency
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Critical,
    ];

    /// Database string code
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }

    /// Parse a database string code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "low" => Some(TicketPriority::Low),
            "medium" => Some(TicketPriority::Medium),
            "high" => Some(TicketPriority::High),
            "critical" => Some(TicketPriority::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of SLA alert raised against a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Warning,
    Critical,
    Breach,
}

impl AlertKind {
    /// Database string code
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Warning => "warning",
            AlertKind::Critical => "critical",
            AlertKind::Breach => "breach",
        }
    }

    /// Parse a database string code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "warning" => Some(AlertKind::Warning),
            "critical" => Some(AlertKind::Critical),
            "breach" => Some(AlertKind::Breach),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
