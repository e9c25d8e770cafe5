//! The check engine: evaluates a service's rules against one probe
//! response.
//!
//! Evaluation is a pure function of (rule, response, now) and never fails:
//! any missing or malformed input a rule depends on degrades to a Crit
//! outcome with a descriptive message. Transport-level probe failures are
//! not handled here; the scheduler converts those into a synthetic
//! availability outcome before routing.

mod json_path;
mod text;

use chrono::{DateTime, Utc};

use crate::models::{CheckOutcome, CheckRule, ProbeResponse, RuleKind};

/// Evaluates every rule of a service against one probe response, in rule
/// order, and returns the outcomes unmodified (no aggregation here).
pub fn evaluate_all(
    rules: &[CheckRule],
    response: &ProbeResponse,
    now: DateTime<Utc>,
) -> Vec<CheckOutcome> {
    rules.iter().map(|rule| evaluate(rule, response, now)).collect()
}

/// Evaluates a single rule against one probe response.
pub fn evaluate(rule: &CheckRule, response: &ProbeResponse, now: DateTime<Utc>) -> CheckOutcome {
    match rule {
        CheckRule::StatusCode { expected } => check_status_code(*expected, response),
        CheckRule::BodyContains { substring } => check_body_contains(substring, response),
        CheckRule::Header { name, value } => check_header(name, value, response),
        CheckRule::JsonField { path, expected } => check_json_field(path, expected, response),
        CheckRule::MaxLatency { threshold } => check_max_latency(*threshold, response),
        CheckRule::SslExpiry { warn_days, crit_days } => {
            check_ssl_expiry(*warn_days, *crit_days, response, now)
        }
    }
}

fn check_status_code(expected: u16, response: &ProbeResponse) -> CheckOutcome {
    if response.status == expected {
        return CheckOutcome::ok(RuleKind::StatusCode);
    }
    CheckOutcome::crit(
        RuleKind::StatusCode,
        format!("expected status {expected}, got {}", response.status),
    )
}

fn check_body_contains(substring: &str, response: &ProbeResponse) -> CheckOutcome {
    let body = text::normalize_space(&text::decode_body(&response.body));
    let needle = text::normalize_space(substring);
    if body.contains(&needle) {
        return CheckOutcome::ok(RuleKind::BodyContains);
    }
    CheckOutcome::crit(RuleKind::BodyContains, format!("body does not contain \"{substring}\""))
}

fn check_header(name: &str, value: &str, response: &ProbeResponse) -> CheckOutcome {
    match response.header(name) {
        None => CheckOutcome::crit(RuleKind::Header, format!("header '{name}' is missing")),
        Some(actual) if actual != value => CheckOutcome::crit(
            RuleKind::Header,
            format!("header '{name}' is '{actual}', expected '{value}'"),
        ),
        Some(_) => CheckOutcome::ok(RuleKind::Header),
    }
}

// The four conditions are checked in a fixed order and the first failure
// determines the message: invalid JSON, wrong declared content type,
// unresolvable path, value mismatch.
fn check_json_field(
    path: &str,
    expected: &serde_json::Value,
    response: &ProbeResponse,
) -> CheckOutcome {
    let document: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(document) => document,
        Err(_) => {
            return CheckOutcome::crit(RuleKind::JsonField, "response body is not valid JSON");
        }
    };

    let content_type = response.header("content-type").unwrap_or_default();
    if content_type != "application/json" {
        return CheckOutcome::crit(
            RuleKind::JsonField,
            format!("content type '{content_type}' is not application/json"),
        );
    }

    let Some(actual) = json_path::resolve(&document, path) else {
        return CheckOutcome::crit(
            RuleKind::JsonField,
            format!("path '{path}' not found in response body"),
        );
    };

    if actual != expected {
        return CheckOutcome::crit(
            RuleKind::JsonField,
            format!("'{path}' is {actual}, expected {expected}"),
        );
    }

    CheckOutcome::ok(RuleKind::JsonField)
}

fn check_max_latency(threshold: std::time::Duration, response: &ProbeResponse) -> CheckOutcome {
    if response.latency <= threshold {
        return CheckOutcome::ok(RuleKind::MaxLatency);
    }
    // A slow response is degraded service, not an outage: Warn, never Crit.
    CheckOutcome::warn(
        RuleKind::MaxLatency,
        format!(
            "response took {}ms, limit {}ms",
            response.latency.as_millis(),
            threshold.as_millis()
        ),
    )
}

fn check_ssl_expiry(
    warn_days: i64,
    crit_days: i64,
    response: &ProbeResponse,
    now: DateTime<Utc>,
) -> CheckOutcome {
    let Some(tls) = &response.tls else {
        return CheckOutcome::crit(RuleKind::SslExpiry, "no TLS information in response");
    };

    let Some(cert) = tls.peer_certificates.first() else {
        return CheckOutcome::crit(RuleKind::SslExpiry, "no peer certificates in response");
    };

    let days_remaining = (cert.not_after - now).num_hours() / 24;
    if days_remaining < crit_days {
        return CheckOutcome::crit(
            RuleKind::SslExpiry,
            format!("certificate expires in {days_remaining} days"),
        );
    }
    if days_remaining < warn_days {
        return CheckOutcome::warn(
            RuleKind::SslExpiry,
            format!("certificate expires in {days_remaining} days"),
        );
    }
    CheckOutcome::ok(RuleKind::SslExpiry)
}
