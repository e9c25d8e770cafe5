//! The per-cycle integration of routing decisions with the state store.

use chrono::{DateTime, Utc};

use crate::{
    models::{aggregate_severity, AlertEvent, AlertRoute, CheckOutcome},
    routing::decide,
    state::StateStore,
};

/// Applies the route table to each cycle's outcomes and delivers to the
/// channels that should fire.
///
/// State is read and written under the store's lock; channel delivery
/// happens strictly after the lock is released so a slow channel can never
/// block another service's cycle.
pub struct RoutingEngine {
    routes: Vec<AlertRoute>,
    states: StateStore,
}

impl RoutingEngine {
    /// Creates an engine over a fixed route table with an empty state
    /// store.
    pub fn new(routes: Vec<AlertRoute>) -> Self {
        Self { routes, states: StateStore::new() }
    }

    /// The underlying state store, exposed for inspection in tests.
    pub fn states(&self) -> &StateStore {
        &self.states
    }

    /// Routes one cycle's outcomes for a service: snapshots prior state,
    /// decides every matching route, updates the state, then delivers.
    ///
    /// `last_outcomes` is updated unconditionally; `last_notified_at` only
    /// when at least one route fired. A service with no matching route at
    /// all is a configuration gap, logged and skipped.
    pub async fn process(&self, service_name: &str, outcomes: Vec<CheckOutcome>, now: DateTime<Utc>) {
        let severity = aggregate_severity(&outcomes);

        let mut matched_any = false;
        let mut firing: Vec<&AlertRoute> = Vec::new();

        self.states.with_state(service_name, |state| {
            for route in &self.routes {
                if !route.matches(service_name) {
                    continue;
                }
                matched_any = true;
                if decide(route, &outcomes, state, now) {
                    firing.push(route);
                }
            }
            state.last_outcomes = outcomes.clone();
            if !firing.is_empty() {
                state.last_notified_at = Some(now);
            }
        });

        if !matched_any {
            tracing::warn!(service = service_name, "no alert route matches service");
            return;
        }
        if firing.is_empty() {
            return;
        }

        let event = AlertEvent {
            service_name: service_name.to_string(),
            severity,
            outcomes,
            timestamp: now,
        };

        // Delivery is fire-and-forget: a failed channel is logged and the
        // cycle's state update above stands regardless.
        for route in firing {
            tracing::info!(
                service = service_name,
                channel = %route.channel_name,
                severity = %event.severity,
                "delivering alert"
            );
            if let Err(error) = route.channel.notify(&event).await {
                tracing::error!(
                    service = service_name,
                    channel = %route.channel_name,
                    %error,
                    "failed to deliver alert"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::Utc;

    use super::*;
    use crate::{
        models::{RuleKind, Severity},
        test_helpers::{outcome, RecordingNotifier, RouteBuilder},
    };

    #[tokio::test]
    async fn updates_state_and_delivers_outside_lock() {
        let channel = Arc::new(RecordingNotifier::new());
        let route = RouteBuilder::new()
            .services(["web"])
            .min_severity(Severity::Warn)
            .channel("rec", channel.clone())
            .build();
        let engine = RoutingEngine::new(vec![route]);

        let now = Utc::now();
        engine.process("web", vec![outcome(RuleKind::StatusCode, Severity::Crit)], now).await;

        let events = channel.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].service_name, "web");
        assert_eq!(events[0].severity, Severity::Crit);

        let state = engine.states().get("web").unwrap();
        assert_eq!(state.last_outcomes.len(), 1);
        assert_eq!(state.last_notified_at, Some(now));
    }

    #[tokio::test]
    async fn last_notified_at_untouched_when_nothing_fires() {
        let channel = Arc::new(RecordingNotifier::new());
        let route = RouteBuilder::new()
            .services(["web"])
            .min_severity(Severity::Crit)
            .channel("rec", channel.clone())
            .build();
        let engine = RoutingEngine::new(vec![route]);

        engine.process("web", vec![outcome(RuleKind::MaxLatency, Severity::Warn)], Utc::now()).await;

        assert_eq!(channel.events().len(), 0);
        let state = engine.states().get("web").unwrap();
        assert_eq!(state.last_outcomes.len(), 1);
        assert!(state.last_notified_at.is_none());
    }

    #[tokio::test]
    async fn routes_filter_by_service_name() {
        let for_web = Arc::new(RecordingNotifier::new());
        let for_api = Arc::new(RecordingNotifier::new());
        let engine = RoutingEngine::new(vec![
            RouteBuilder::new().services(["web"]).channel("web-chan", for_web.clone()).build(),
            RouteBuilder::new().services(["api"]).channel("api-chan", for_api.clone()).build(),
        ]);

        engine.process("web", vec![outcome(RuleKind::StatusCode, Severity::Crit)], Utc::now()).await;

        assert_eq!(for_web.events().len(), 1);
        assert_eq!(for_api.events().len(), 0);
    }

    #[tokio::test]
    async fn service_without_routes_is_not_fatal() {
        let engine = RoutingEngine::new(vec![]);
        engine.process("orphan", vec![outcome(RuleKind::StatusCode, Severity::Crit)], Utc::now()).await;
        // State is still recorded for the next cycle.
        assert!(engine.states().get("orphan").is_some());
    }

    #[tokio::test]
    async fn delivery_failure_does_not_poison_state() {
        let channel = Arc::new(RecordingNotifier::failing());
        let route = RouteBuilder::new().services(["web"]).channel("bad", channel.clone()).build();
        let engine = RoutingEngine::new(vec![route]);

        let now = Utc::now();
        engine.process("web", vec![outcome(RuleKind::StatusCode, Severity::Crit)], now).await;

        // The decision stands even though delivery failed.
        let state = engine.states().get("web").unwrap();
        assert_eq!(state.last_notified_at, Some(now));
    }

    #[tokio::test]
    async fn heartbeat_refires_across_cycles() {
        let channel = Arc::new(RecordingNotifier::new());
        let route = RouteBuilder::new()
            .services(["web"])
            .min_severity(Severity::Warn)
            .only_on_change(true)
            .repeat_interval(Duration::from_secs(300))
            .channel("rec", channel.clone())
            .build();
        let engine = RoutingEngine::new(vec![route]);

        let failing = vec![outcome(RuleKind::StatusCode, Severity::Crit)];
        let t0 = Utc::now();
        engine.process("web", failing.clone(), t0).await;
        assert_eq!(channel.events().len(), 1);

        // Same condition two minutes later: suppressed.
        engine.process("web", failing.clone(), t0 + chrono::Duration::minutes(2)).await;
        assert_eq!(channel.events().len(), 1);

        // Past the repeat interval: fires again.
        engine.process("web", failing.clone(), t0 + chrono::Duration::minutes(8)).await;
        assert_eq!(channel.events().len(), 2);
    }
}
