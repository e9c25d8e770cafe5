//! The polling scheduler: one task per monitored service with coordinated
//! startup and a bounded, cancellable shutdown.
//!
//! Lifecycle: `Created → Running → Stopping → Stopped`, with restart
//! allowed from `Stopped`. Each service task owns its own interval timer
//! (first fire one full interval after start) and a clone of a shared
//! cancellation token. Cancellation is cooperative: a tick already in
//! flight completes its probe/check/route pipeline before the task
//! observes the signal on its next loop iteration.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use thiserror::Error;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    checks,
    models::{CheckOutcome, RuleKind, Service},
    probe::Prober,
    routing::RoutingEngine,
};

/// Lifecycle misuse and shutdown conditions reported to the caller.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// `start` was called while the watchdog was already running.
    #[error("watchdog already started")]
    AlreadyStarted,

    /// `stop` was called while the watchdog was not running.
    #[error("watchdog already stopped")]
    AlreadyStopped,

    /// The drain did not finish before the deadline. Tasks keep draining
    /// in the background; the caller decides whether to exit anyway.
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Owns one polling task per registered service.
pub struct Watchdog {
    services: Vec<Arc<Service>>,
    prober: Arc<dyn Prober>,
    routing: Arc<RoutingEngine>,
    cancellation_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    lifecycle: Lifecycle,
}

impl Watchdog {
    /// Creates a watchdog over a fixed service set. No tasks run until
    /// [`start`](Self::start).
    pub fn new(services: Vec<Service>, prober: Arc<dyn Prober>, routing: Arc<RoutingEngine>) -> Self {
        Self {
            services: services.into_iter().map(Arc::new).collect(),
            prober,
            routing,
            cancellation_token: CancellationToken::new(),
            tasks: Vec::new(),
            lifecycle: Lifecycle::Created,
        }
    }

    /// The routing engine, exposed for state inspection in tests.
    pub fn routing(&self) -> &RoutingEngine {
        &self.routing
    }

    /// Spawns one polling task per service, all bound to a fresh shared
    /// cancellation token.
    pub fn start(&mut self) -> Result<(), WatchdogError> {
        match self.lifecycle {
            Lifecycle::Created | Lifecycle::Stopped => {}
            Lifecycle::Running | Lifecycle::Stopping => return Err(WatchdogError::AlreadyStarted),
        }

        self.cancellation_token = CancellationToken::new();
        for service in &self.services {
            let task = ServiceTask {
                service: Arc::clone(service),
                prober: Arc::clone(&self.prober),
                routing: Arc::clone(&self.routing),
                token: self.cancellation_token.clone(),
            };
            self.tasks.push(tokio::spawn(task.run()));
        }

        self.lifecycle = Lifecycle::Running;
        tracing::info!(services = self.services.len(), "watchdog started");
        Ok(())
    }

    /// Signals cancellation to every task and waits for them to finish,
    /// bounded by `deadline`.
    ///
    /// On timeout the remaining tasks are detached, not aborted, so a
    /// tick in flight still completes its pipeline in the background. A
    /// second call after either outcome reports [`WatchdogError::AlreadyStopped`].
    pub async fn stop(&mut self, deadline: Duration) -> Result<(), WatchdogError> {
        if self.lifecycle != Lifecycle::Running {
            return Err(WatchdogError::AlreadyStopped);
        }
        self.lifecycle = Lifecycle::Stopping;
        self.cancellation_token.cancel();

        let handles = std::mem::take(&mut self.tasks);
        let drain = futures::future::join_all(handles);

        let result = tokio::time::timeout(deadline, drain).await;
        self.lifecycle = Lifecycle::Stopped;

        match result {
            Ok(results) => {
                for join_result in results {
                    if let Err(error) = join_result {
                        tracing::error!(%error, "service task ended abnormally");
                    }
                }
                tracing::info!("watchdog stopped");
                Ok(())
            }
            Err(_) => Err(WatchdogError::ShutdownTimeout(deadline)),
        }
    }
}

/// One service's polling loop and its per-tick pipeline.
struct ServiceTask {
    service: Arc<Service>,
    prober: Arc<dyn Prober>,
    routing: Arc<RoutingEngine>,
    token: CancellationToken,
}

impl ServiceTask {
    async fn run(self) {
        let mut ticker =
            interval_at(Instant::now() + self.service.interval, self.service.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    tracing::info!(service = %self.service.name, "stopping polling task");
                    return;
                }
                _ = ticker.tick() => {
                    // A tick that races the cancellation signal exits
                    // without starting partial work.
                    if self.token.is_cancelled() {
                        tracing::info!(service = %self.service.name, "stopping polling task");
                        return;
                    }
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One tick: probe, score, route. Errors never escape the task; a
    /// failed probe becomes a synthetic availability outcome and the
    /// service keeps polling on schedule.
    async fn run_cycle(&self) {
        let outcomes: Vec<CheckOutcome> = match self.prober.probe(&self.service.url).await {
            Ok(response) => {
                tracing::debug!(
                    service = %self.service.name,
                    status = response.status,
                    latency_ms = response.latency.as_millis() as u64,
                    "probe completed"
                );
                checks::evaluate_all(&self.service.rules, &response, Utc::now())
            }
            Err(error) => {
                tracing::warn!(service = %self.service.name, %error, "probe failed");
                vec![CheckOutcome::crit(RuleKind::Availability, error.to_string())]
            }
        };

        self.routing.process(&self.service.name, outcomes, Utc::now()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        models::Severity,
        probe::MockProber,
        test_helpers::{probe_response_with_status, RecordingNotifier, RouteBuilder, ServiceBuilder},
    };

    fn watchdog_with_mock(
        mock: MockProber,
        channel: Arc<RecordingNotifier>,
    ) -> Watchdog {
        let service = ServiceBuilder::new("web").interval(Duration::from_secs(1)).build();
        let route = RouteBuilder::new()
            .services(["web"])
            .min_severity(Severity::Warn)
            .channel("rec", channel)
            .build();
        Watchdog::new(vec![service], Arc::new(mock), Arc::new(RoutingEngine::new(vec![route])))
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failure_becomes_availability_crit() {
        let mut mock = MockProber::new();
        mock.expect_probe()
            .returning(|_| Err(crate::probe::ProbeError::Transport("connection refused".into())));

        let channel = Arc::new(RecordingNotifier::new());
        let mut watchdog = watchdog_with_mock(mock, channel.clone());
        watchdog.start().unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        watchdog.stop(Duration::from_secs(5)).await.unwrap();

        let events = channel.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Crit);
        assert_eq!(events[0].outcomes.len(), 1);
        assert_eq!(events[0].outcomes[0].rule_kind, RuleKind::Availability);
        assert!(events[0].outcomes[0].message.contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_probe_before_first_full_interval() {
        let mut mock = MockProber::new();
        mock.expect_probe().times(0);

        let channel = Arc::new(RecordingNotifier::new());
        let mut watchdog = watchdog_with_mock(mock, channel.clone());
        watchdog.start().unwrap();

        // Just short of the first interval: nothing may have fired.
        tokio::time::sleep(Duration::from_millis(900)).await;
        watchdog.stop(Duration::from_secs(5)).await.unwrap();
        assert!(channel.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_service_does_not_affect_others() {
        let healthy = Arc::new(RecordingNotifier::new());
        let broken = Arc::new(RecordingNotifier::new());

        let mut mock = MockProber::new();
        mock.expect_probe().returning(|url| {
            if url.host_str() == Some("bad.example.com") {
                Err(crate::probe::ProbeError::Transport("dns failure".into()))
            } else {
                Ok(probe_response_with_status(200))
            }
        });

        let services = vec![
            ServiceBuilder::new("good")
                .url("http://good.example.com")
                .interval(Duration::from_secs(1))
                .build(),
            ServiceBuilder::new("bad")
                .url("http://bad.example.com")
                .interval(Duration::from_secs(1))
                .build(),
        ];
        let routes = vec![
            RouteBuilder::new().services(["good"]).channel("h", healthy.clone()).build(),
            RouteBuilder::new().services(["bad"]).channel("b", broken.clone()).build(),
        ];
        let mut watchdog =
            Watchdog::new(services, Arc::new(mock), Arc::new(RoutingEngine::new(routes)));
        watchdog.start().unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        watchdog.stop(Duration::from_secs(5)).await.unwrap();

        // The healthy service stayed quiet, the broken one alerted.
        assert_eq!(healthy.events().len(), 0);
        assert_eq!(broken.events().len(), 1);
    }
}
