//! Builders and fakes shared by unit and integration tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::{
    models::{
        AlertEvent, AlertRoute, CheckOutcome, CheckRule, PeerCertificate, ProbeResponse,
        RuleKind, Service, Severity, TlsInfo,
    },
    notifications::{NotificationError, Notifier, StdoutNotifier},
    probe::{ProbeError, Prober},
};

/// A builder for creating [`ProbeResponse`] instances for testing.
pub struct ProbeResponseBuilder {
    response: ProbeResponse,
}

impl ProbeResponseBuilder {
    /// Creates a builder for a 200 response with an empty body, 50ms
    /// latency and no TLS info.
    pub fn new() -> Self {
        Self {
            response: ProbeResponse {
                status: 200,
                headers: HashMap::new(),
                body: Vec::new(),
                latency: Duration::from_millis(50),
                tls: None,
            },
        }
    }

    /// Sets the response status.
    pub fn status(mut self, status: u16) -> Self {
        self.response.status = status;
        self
    }

    /// Adds a response header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.response.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Sets the raw body bytes.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.response.body = body;
        self
    }

    /// Sets the body from a string.
    pub fn body_str(mut self, body: &str) -> Self {
        self.response.body = body.as_bytes().to_vec();
        self
    }

    /// Sets the measured latency.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.response.latency = latency;
        self
    }

    /// Attaches TLS info with a leaf certificate expiring in `days` days
    /// (plus an hour of slack so truncation lands on `days`).
    pub fn tls_expiring_in_days(mut self, days: i64) -> Self {
        let now = Utc::now();
        self.response.tls = Some(TlsInfo {
            peer_certificates: vec![PeerCertificate {
                subject: "CN=test".to_string(),
                not_before: now - chrono::Duration::days(30),
                not_after: now + chrono::Duration::days(days) + chrono::Duration::hours(1),
            }],
        });
        self
    }

    /// Attaches TLS info with an empty peer certificate list.
    pub fn empty_tls(mut self) -> Self {
        self.response.tls = Some(TlsInfo { peer_certificates: Vec::new() });
        self
    }

    /// Builds the response.
    pub fn build(self) -> ProbeResponse {
        self.response
    }
}

impl Default for ProbeResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A response with the given status and defaults everywhere else.
pub fn probe_response_with_status(status: u16) -> ProbeResponse {
    ProbeResponseBuilder::new().status(status).build()
}

/// A minimal outcome of the given kind and severity, with a placeholder
/// message for non-passing severities.
pub fn outcome(rule_kind: RuleKind, severity: Severity) -> CheckOutcome {
    match severity {
        Severity::Ok => CheckOutcome::ok(rule_kind),
        _ => CheckOutcome { rule_kind, severity, message: format!("{rule_kind} check failed") },
    }
}

/// A builder for creating [`Service`] instances for testing.
pub struct ServiceBuilder {
    name: String,
    url: Url,
    interval: Duration,
    rules: Vec<CheckRule>,
}

impl ServiceBuilder {
    /// Creates a builder for a service probing `http://localhost` every
    /// second with a single `status_code = 200` rule.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: Url::parse("http://localhost").unwrap(),
            interval: Duration::from_secs(1),
            rules: Vec::new(),
        }
    }

    /// Sets the probed URL.
    pub fn url(mut self, url: &str) -> Self {
        self.url = Url::parse(url).unwrap();
        self
    }

    /// Sets the polling interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Appends a check rule.
    pub fn rule(mut self, rule: CheckRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Builds the service, defaulting to a single `status_code = 200`
    /// rule when none were added.
    pub fn build(self) -> Service {
        let rules = if self.rules.is_empty() {
            vec![CheckRule::StatusCode { expected: 200 }]
        } else {
            self.rules
        };
        Service { name: self.name, url: self.url, interval: self.interval, rules }
    }
}

/// A builder for creating [`AlertRoute`] instances for testing.
pub struct RouteBuilder {
    service_names: HashSet<String>,
    min_severity: Severity,
    only_on_change: bool,
    notify_on_recovery: bool,
    repeat_interval: Duration,
    channel_name: String,
    channel: Arc<dyn Notifier>,
}

impl RouteBuilder {
    /// Creates a builder with a Warn floor, no change-gating, no recovery
    /// notifications, a 300s repeat interval and a stdout channel.
    pub fn new() -> Self {
        Self {
            service_names: HashSet::new(),
            min_severity: Severity::Warn,
            only_on_change: false,
            notify_on_recovery: false,
            repeat_interval: Duration::from_secs(300),
            channel_name: "stdout".to_string(),
            channel: Arc::new(StdoutNotifier),
        }
    }

    /// Sets the service-name filter.
    pub fn services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the severity floor.
    pub fn min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Sets change-gating.
    pub fn only_on_change(mut self, only_on_change: bool) -> Self {
        self.only_on_change = only_on_change;
        self
    }

    /// Sets recovery notifications.
    pub fn notify_on_recovery(mut self, notify_on_recovery: bool) -> Self {
        self.notify_on_recovery = notify_on_recovery;
        self
    }

    /// Sets the repeat interval.
    pub fn repeat_interval(mut self, repeat_interval: Duration) -> Self {
        self.repeat_interval = repeat_interval;
        self
    }

    /// Sets the delivery channel.
    pub fn channel(mut self, name: &str, channel: Arc<dyn Notifier>) -> Self {
        self.channel_name = name.to_string();
        self.channel = channel;
        self
    }

    /// Builds the route.
    pub fn build(self) -> AlertRoute {
        AlertRoute {
            service_names: self.service_names,
            min_severity: self.min_severity,
            only_on_change: self.only_on_change,
            notify_on_recovery: self.notify_on_recovery,
            repeat_interval: self.repeat_interval,
            channel_name: self.channel_name,
            channel: self.channel,
        }
    }
}

impl Default for RouteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A channel that records every delivered event, optionally failing each
/// delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AlertEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A channel that records and succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that fails every delivery without recording.
    pub fn failing() -> Self {
        Self { events: Mutex::new(Vec::new()), fail: true }
    }

    /// The events delivered so far.
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Delivery("recording channel set to fail".to_string()));
        }
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
        Ok(())
    }
}

/// A prober that replays a scripted sequence of results, then repeats the
/// last one. Counts every call.
pub struct ScriptedProber {
    script: Mutex<VecDeque<Result<ProbeResponse, ProbeError>>>,
    fallback: Result<ProbeResponse, ProbeError>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    /// Creates a prober replaying `script` in order.
    pub fn new(script: Vec<Result<ProbeResponse, ProbeError>>) -> Self {
        let fallback =
            script.last().cloned().unwrap_or_else(|| Ok(probe_response_with_status(200)));
        Self { script: Mutex::new(script.into()), fallback, calls: AtomicUsize::new(0) }
    }

    /// Creates a prober replaying plain responses with the given status
    /// codes.
    pub fn with_statuses(statuses: &[u16]) -> Self {
        Self::new(statuses.iter().map(|s| Ok(probe_response_with_status(*s))).collect())
    }

    /// How many times `probe` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// A prober that sleeps before answering, for exercising shutdown
/// deadlines against an in-flight probe.
pub struct SlowProber {
    delay: Duration,
}

impl SlowProber {
    /// Creates a prober that takes `delay` to answer every probe.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Prober for SlowProber {
    async fn probe(&self, _url: &Url) -> Result<ProbeResponse, ProbeError> {
        tokio::time::sleep(self.delay).await;
        Ok(probe_response_with_status(200))
    }
}
