//! Alert routing and deduplication.
//!
//! [`decide`] is the pure per-route policy: given the new outcomes, the
//! prior state and the current time, should this route's channel fire now?
//! [`RoutingEngine`] applies it across the route table each cycle and owns
//! the state updates around it.

mod engine;

pub use engine::RoutingEngine;

use chrono::{DateTime, Utc};

use crate::models::{aggregate_severity, AlertRoute, CheckOutcome, RuleKind, ServiceState, Severity};

/// Decides whether a route's channel should fire for the given cycle.
///
/// The checks run in a fixed order:
/// 1. recovery (Ok after non-Ok) is gated solely by `notify_on_recovery`;
/// 2. below `min_severity`, never fire;
/// 3. with `only_on_change`: fire on a changed outcome set, otherwise only
///    once the repeat interval since the last notification has elapsed;
/// 4. without change-gating, every tick above the floor fires.
pub fn decide(
    route: &AlertRoute,
    new_outcomes: &[CheckOutcome],
    prior: &ServiceState,
    now: DateTime<Utc>,
) -> bool {
    let actual = aggregate_severity(new_outcomes);
    let previous = aggregate_severity(&prior.last_outcomes);

    if actual == Severity::Ok && previous != Severity::Ok {
        return route.notify_on_recovery;
    }

    if actual < route.min_severity {
        return false;
    }

    if route.only_on_change {
        if !outcomes_equivalent(new_outcomes, &prior.last_outcomes) {
            return true;
        }
        return match prior.last_notified_at {
            Some(last_sent) => now
                .signed_duration_since(last_sent)
                .to_std()
                .map(|elapsed| elapsed > route.repeat_interval)
                .unwrap_or(false),
            None => true,
        };
    }

    true
}

/// Whether two outcome lists describe the same condition: the same rule
/// kinds mapped to the same severities, order-independent, messages
/// ignored.
pub fn outcomes_equivalent(a: &[CheckOutcome], b: &[CheckOutcome]) -> bool {
    signature(a) == signature(b)
}

fn signature(outcomes: &[CheckOutcome]) -> Vec<(RuleKind, Severity)> {
    let mut pairs: Vec<_> = outcomes.iter().map(|o| (o.rule_kind, o.severity)).collect();
    pairs.sort();
    pairs
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::test_helpers::{outcome, RouteBuilder};

    fn state_with(
        outcomes: Vec<CheckOutcome>,
        last_notified_at: Option<DateTime<Utc>>,
    ) -> ServiceState {
        ServiceState { last_outcomes: outcomes, last_notified_at }
    }

    #[test]
    fn recovery_is_gated_solely_by_flag() {
        let now = Utc::now();
        let prior = state_with(vec![outcome(RuleKind::StatusCode, Severity::Crit)], Some(now));
        let new = vec![outcome(RuleKind::StatusCode, Severity::Ok)];

        // Even with the lowest possible floor, recovery obeys only the flag.
        let muted = RouteBuilder::new().notify_on_recovery(false).min_severity(Severity::Ok).build();
        assert!(!decide(&muted, &new, &prior, now));

        // And even a Crit-only route fires recovery when the flag is set.
        let vocal = RouteBuilder::new().notify_on_recovery(true).min_severity(Severity::Crit).build();
        assert!(decide(&vocal, &new, &prior, now));
    }

    #[test]
    fn steady_ok_is_not_a_recovery() {
        let now = Utc::now();
        let prior = state_with(vec![outcome(RuleKind::StatusCode, Severity::Ok)], None);
        let new = vec![outcome(RuleKind::StatusCode, Severity::Ok)];

        let route = RouteBuilder::new().notify_on_recovery(true).min_severity(Severity::Warn).build();
        assert!(!decide(&route, &new, &prior, now));
    }

    #[test]
    fn below_min_severity_never_fires() {
        let now = Utc::now();
        let prior = state_with(vec![outcome(RuleKind::StatusCode, Severity::Ok)], None);
        let new = vec![outcome(RuleKind::MaxLatency, Severity::Warn)];

        let route = RouteBuilder::new().min_severity(Severity::Crit).only_on_change(true).build();
        // The outcome set changed, but the floor is checked first.
        assert!(!decide(&route, &new, &prior, now));
    }

    #[test]
    fn change_gated_route_fires_on_changed_outcomes() {
        let now = Utc::now();
        let prior = state_with(vec![outcome(RuleKind::StatusCode, Severity::Ok)], Some(now));
        let new = vec![outcome(RuleKind::StatusCode, Severity::Crit)];

        let route = RouteBuilder::new().min_severity(Severity::Warn).only_on_change(true).build();
        assert!(decide(&route, &new, &prior, now));
    }

    #[test]
    fn unchanged_outcomes_refire_only_after_repeat_interval() {
        let now = Utc::now();
        let failing = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        let route = RouteBuilder::new()
            .min_severity(Severity::Warn)
            .only_on_change(true)
            .repeat_interval(Duration::from_secs(300))
            .build();

        let recent = state_with(failing.clone(), Some(now - chrono::Duration::minutes(2)));
        assert!(!decide(&route, &failing, &recent, now));

        let stale = state_with(failing.clone(), Some(now - chrono::Duration::minutes(10)));
        assert!(decide(&route, &failing, &stale, now));
    }

    #[test]
    fn unchanged_outcomes_with_no_prior_notification_fire() {
        let now = Utc::now();
        let failing = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        let route = RouteBuilder::new().min_severity(Severity::Warn).only_on_change(true).build();

        let prior = state_with(failing.clone(), None);
        assert!(decide(&route, &failing, &prior, now));
    }

    #[test]
    fn without_change_gating_every_tick_fires() {
        let now = Utc::now();
        let failing = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        let route = RouteBuilder::new().min_severity(Severity::Warn).only_on_change(false).build();

        // Unchanged outcomes, freshly notified: still fires.
        let prior = state_with(failing.clone(), Some(now));
        assert!(decide(&route, &failing, &prior, now));
    }

    #[test]
    fn first_cycle_has_no_prior_state() {
        let now = Utc::now();
        let route = RouteBuilder::new().min_severity(Severity::Warn).only_on_change(true).build();

        let fresh = ServiceState::default();
        let failing = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        assert!(decide(&route, &failing, &fresh, now));

        // A first healthy cycle is not a recovery either.
        let healthy = vec![outcome(RuleKind::StatusCode, Severity::Ok)];
        assert!(!decide(&route, &healthy, &fresh, now));
    }

    #[test]
    fn equivalence_ignores_order_and_messages() {
        let a = vec![
            CheckOutcome::crit(RuleKind::StatusCode, "expected status 200, got 500"),
            CheckOutcome::warn(RuleKind::MaxLatency, "response took 900ms, limit 200ms"),
        ];
        let b = vec![
            CheckOutcome::warn(RuleKind::MaxLatency, "response took 450ms, limit 200ms"),
            CheckOutcome::crit(RuleKind::StatusCode, "expected status 200, got 503"),
        ];
        assert!(outcomes_equivalent(&a, &b));
    }

    #[test]
    fn equivalence_detects_severity_shift() {
        let a = vec![outcome(RuleKind::SslExpiry, Severity::Warn)];
        let b = vec![outcome(RuleKind::SslExpiry, Severity::Crit)];
        assert!(!outcomes_equivalent(&a, &b));
    }

    #[test]
    fn equivalence_detects_added_rule_kind() {
        let a = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        let b = vec![
            outcome(RuleKind::StatusCode, Severity::Crit),
            outcome(RuleKind::Header, Severity::Crit),
        ];
        assert!(!outcomes_equivalent(&a, &b));
    }
}
