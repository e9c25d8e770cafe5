//! The binding of a set of services to one notification channel.

use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::{models::check::Severity, notifications::Notifier};

/// One routing rule: which services it covers, the delivery policy, and the
/// channel it delivers to.
///
/// Routes are immutable and loaded once at startup. The relation is
/// many-to-many: a service may match several routes and a route may cover
/// several services.
#[derive(Clone)]
pub struct AlertRoute {
    /// Names of the services this route applies to.
    pub service_names: HashSet<String>,
    /// Outcomes aggregating below this severity never notify (except
    /// recovery, which bypasses the floor).
    pub min_severity: Severity,
    /// When set, unchanged outcomes re-notify only after `repeat_interval`.
    pub only_on_change: bool,
    /// Whether a transition back to Ok produces a notification.
    pub notify_on_recovery: bool,
    /// Heartbeat interval for re-firing an unchanged failing state.
    pub repeat_interval: Duration,
    /// The channel name, for logs.
    pub channel_name: String,
    /// The sink that receives matching alert events.
    pub channel: Arc<dyn Notifier>,
}

impl AlertRoute {
    /// Whether this route's service filter includes the given service.
    pub fn matches(&self, service_name: &str) -> bool {
        self.service_names.contains(service_name)
    }
}

impl std::fmt::Debug for AlertRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertRoute")
            .field("service_names", &self.service_names)
            .field("min_severity", &self.min_severity)
            .field("only_on_change", &self.only_on_change)
            .field("notify_on_recovery", &self.notify_on_recovery)
            .field("repeat_interval", &self.repeat_interval)
            .field("channel_name", &self.channel_name)
            .finish_non_exhaustive()
    }
}
