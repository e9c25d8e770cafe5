//! The payload delivered to notification channels.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::check::{CheckOutcome, Severity};

/// One alert delivery: the service, its aggregate severity, and the full
/// outcome list behind it. Built fresh per delivery, never retained.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// The service this alert concerns.
    pub service_name: String,
    /// Aggregate severity over `outcomes`.
    pub severity: Severity,
    /// Every outcome from the cycle, passing checks included.
    pub outcomes: Vec<CheckOutcome>,
    /// When the cycle's routing decision was made.
    pub timestamp: DateTime<Utc>,
}
