//! The mutable last-observed state kept per monitored service.

use chrono::{DateTime, Utc};

use super::check::CheckOutcome;

/// Per-service mutable record: the previous cycle's outcomes and the time
/// of the last delivered notification.
///
/// Created lazily on a service's first cycle and updated on every cycle.
/// A fresh default (empty outcomes, no notification timestamp) is the
/// "no prior state" case: empty outcomes aggregate to Ok, and an absent
/// timestamp behaves as "repeat interval elapsed".
#[derive(Debug, Clone, Default)]
pub struct ServiceState {
    /// The outcome list from the most recent completed cycle.
    pub last_outcomes: Vec<CheckOutcome>,
    /// When a notification was last sent for this service, if ever.
    pub last_notified_at: Option<DateTime<Utc>>,
}
