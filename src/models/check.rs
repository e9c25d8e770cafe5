//! Check rules, their outcomes, and the severity scale they report on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{deserialize_duration_from_ms, serialize_duration_to_ms};

/// Health level reported by a single check, ordered from healthy to failing.
///
/// The derived `Ord` follows declaration order: `Ok < Warn < Crit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The check passed.
    Ok,
    /// The check found a degraded but non-failing condition.
    Warn,
    /// The check failed.
    Crit,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ok => write!(f, "ok"),
            Severity::Warn => write!(f, "warn"),
            Severity::Crit => write!(f, "crit"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Severity::Ok),
            "warn" => Ok(Severity::Warn),
            "crit" => Ok(Severity::Crit),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// The kind of check that produced an outcome.
///
/// `Availability` is never configured directly: the scheduler synthesizes it
/// when a probe fails at the transport level before any rule can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Exact response status code comparison.
    StatusCode,
    /// Substring search in the decoded, whitespace-normalized body.
    BodyContains,
    /// Exact header value comparison.
    Header,
    /// Deep equality of a JSON value at a dot-path.
    JsonField,
    /// Response latency ceiling.
    MaxLatency,
    /// TLS certificate expiry window.
    #[serde(rename = "ssl_not_expired")]
    SslExpiry,
    /// Synthetic kind for probe transport failures.
    Availability,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleKind::StatusCode => "status_code",
            RuleKind::BodyContains => "body_contains",
            RuleKind::Header => "header",
            RuleKind::JsonField => "json_field",
            RuleKind::MaxLatency => "max_latency",
            RuleKind::SslExpiry => "ssl_not_expired",
            RuleKind::Availability => "availability",
        };
        write!(f, "{s}")
    }
}

/// A single stateless assertion evaluated against one probe response.
///
/// The enum is the configuration format: services list their checks as
/// tagged tables (`type = "status_code"`, ...). Field-level validation
/// happens in the config layer before a rule ever reaches the check engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckRule {
    /// Passes iff the response status equals `expected`.
    StatusCode {
        /// The expected HTTP status code.
        expected: u16,
    },
    /// Passes iff the decoded body contains `substring` after whitespace
    /// normalization of both sides.
    BodyContains {
        /// The substring that must appear in the body.
        substring: String,
    },
    /// Passes iff the named header is present and equal to `value`.
    Header {
        /// The header name, matched case-insensitively.
        name: String,
        /// The exact expected header value.
        value: String,
    },
    /// Passes iff the body is JSON, declared as such, and the value at
    /// `path` deep-equals `expected`.
    JsonField {
        /// Dot-separated path into the JSON document.
        path: String,
        /// The expected value at the path.
        expected: serde_json::Value,
    },
    /// Warns when the measured latency exceeds the threshold.
    MaxLatency {
        /// The latency ceiling in milliseconds.
        #[serde(
            rename = "max_latency_ms",
            deserialize_with = "deserialize_duration_from_ms",
            serialize_with = "serialize_duration_to_ms"
        )]
        threshold: Duration,
    },
    /// Warns/fails as the peer certificate approaches its expiry date.
    /// Config validation guarantees `warn_days >= crit_days > 0`.
    #[serde(rename = "ssl_not_expired")]
    SslExpiry {
        /// Days remaining below which the outcome is Warn.
        warn_days: i64,
        /// Days remaining below which the outcome is Crit.
        crit_days: i64,
    },
}

impl CheckRule {
    /// Returns the kind tag for this rule.
    pub fn kind(&self) -> RuleKind {
        match self {
            CheckRule::StatusCode { .. } => RuleKind::StatusCode,
            CheckRule::BodyContains { .. } => RuleKind::BodyContains,
            CheckRule::Header { .. } => RuleKind::Header,
            CheckRule::JsonField { .. } => RuleKind::JsonField,
            CheckRule::MaxLatency { .. } => RuleKind::MaxLatency,
            CheckRule::SslExpiry { .. } => RuleKind::SslExpiry,
        }
    }
}

/// The scored result of evaluating one rule against one probe response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// The kind of rule that produced this outcome.
    pub rule_kind: RuleKind,
    /// The severity the rule assigned.
    pub severity: Severity,
    /// Human-readable detail; empty for passing checks.
    pub message: String,
}

impl CheckOutcome {
    /// A passing outcome for the given rule kind.
    pub fn ok(rule_kind: RuleKind) -> Self {
        Self { rule_kind, severity: Severity::Ok, message: String::new() }
    }

    /// A Warn outcome with a message.
    pub fn warn(rule_kind: RuleKind, message: impl Into<String>) -> Self {
        Self { rule_kind, severity: Severity::Warn, message: message.into() }
    }

    /// A Crit outcome with a message.
    pub fn crit(rule_kind: RuleKind, message: impl Into<String>) -> Self {
        Self { rule_kind, severity: Severity::Crit, message: message.into() }
    }
}

/// Reduces a cycle's outcome list to a single severity: the maximum over
/// all outcomes, with an empty list defined as `Ok`.
pub fn aggregate_severity(outcomes: &[CheckOutcome]) -> Severity {
    outcomes.iter().map(|o| o.severity).max().unwrap_or(Severity::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Ok < Severity::Warn);
        assert!(Severity::Warn < Severity::Crit);
    }

    #[test]
    fn severity_round_trips_through_str() {
        for sev in [Severity::Ok, Severity::Warn, Severity::Crit] {
            let parsed: Severity = sev.to_string().parse().unwrap();
            assert_eq!(parsed, sev);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn aggregate_is_max_over_outcomes() {
        let outcomes = vec![
            CheckOutcome::ok(RuleKind::StatusCode),
            CheckOutcome::warn(RuleKind::MaxLatency, "slow"),
            CheckOutcome::crit(RuleKind::Header, "missing"),
        ];
        assert_eq!(aggregate_severity(&outcomes), Severity::Crit);

        let outcomes = vec![
            CheckOutcome::ok(RuleKind::StatusCode),
            CheckOutcome::warn(RuleKind::MaxLatency, "slow"),
        ];
        assert_eq!(aggregate_severity(&outcomes), Severity::Warn);
    }

    #[test]
    fn aggregate_of_empty_list_is_ok() {
        assert_eq!(aggregate_severity(&[]), Severity::Ok);
    }

    #[test]
    fn check_rule_deserializes_from_tagged_config() {
        let rule: CheckRule = serde_json::from_value(serde_json::json!({
            "type": "status_code",
            "expected": 200,
        }))
        .unwrap();
        assert_eq!(rule, CheckRule::StatusCode { expected: 200 });
        assert_eq!(rule.kind(), RuleKind::StatusCode);

        let rule: CheckRule = serde_json::from_value(serde_json::json!({
            "type": "ssl_not_expired",
            "warn_days": 14,
            "crit_days": 7,
        }))
        .unwrap();
        assert_eq!(rule, CheckRule::SslExpiry { warn_days: 14, crit_days: 7 });
        assert_eq!(rule.kind(), RuleKind::SslExpiry);

        let rule: CheckRule = serde_json::from_value(serde_json::json!({
            "type": "max_latency",
            "max_latency_ms": 250,
        }))
        .unwrap();
        assert_eq!(rule, CheckRule::MaxLatency { threshold: Duration::from_millis(250) });
    }
}
