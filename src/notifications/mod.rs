//! Notification channels: opaque sinks for alert events.
//!
//! Channels are fire-and-forget from the core's perspective: the routing
//! engine logs a failed delivery and moves on. It never retries and never
//! lets a channel error reach the scheduling path. Transient HTTP failures
//! are retried inside the delivery client itself (see
//! [`crate::http_client`]).

mod email;
mod stdout;
mod telegram;
mod webhook;

pub use email::EmailNotifier;
pub use stdout::StdoutNotifier;
pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AlertEvent, Severity};

/// Errors a notification channel can report back to the routing engine.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The channel was configured with unusable values.
    #[error("channel configuration error: {0}")]
    Config(String),

    /// The delivery attempt failed.
    #[error("failed to deliver notification: {0}")]
    Delivery(String),
}

/// A sink that accepts structured alert events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one alert event.
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError>;
}

/// Renders an event as the plain-text block shared by the text-oriented
/// channels: a `[severity] service` headline followed by one line per
/// non-passing check.
pub fn format_event(event: &AlertEvent) -> String {
    let mut lines = vec![format!("[{}] {}", event.severity, event.service_name)];
    for outcome in &event.outcomes {
        if outcome.severity == Severity::Ok {
            continue;
        }
        lines.push(format!("  {} ({}): {}", outcome.rule_kind, outcome.severity, outcome.message));
    }
    if lines.len() == 1 {
        lines.push("  all checks passing".to_string());
    }
    lines.join("\n")
}
