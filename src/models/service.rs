//! The static definition of one monitored endpoint.

use std::time::Duration;

use url::Url;

use super::check::CheckRule;

/// One monitored HTTP endpoint with its polling interval and check rules.
///
/// Immutable after construction and owned by the
/// [`Watchdog`](crate::watchdog::Watchdog) for the process lifetime. The
/// config layer guarantees a unique non-empty name, an interval of at least
/// one second, and a non-empty rule list before a `Service` is built.
#[derive(Debug, Clone)]
pub struct Service {
    /// Unique service name; the key into the state store and route filters.
    pub name: String,
    /// The URL probed each cycle.
    pub url: Url,
    /// Time between polling ticks; also the retry cadence after failures.
    pub interval: Duration,
    /// The ordered rule set evaluated against every probe response.
    pub rules: Vec<CheckRule>,
}
