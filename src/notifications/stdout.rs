//! A channel that prints alerts to standard output. Useful for local runs
//! and as the simplest possible sink in examples.

use super::{format_event, NotificationError, Notifier};
use crate::models::AlertEvent;

/// Prints alert events to stdout.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        println!("=== Alert: {} ===\n{}\n", event.service_name, format_event(event));
        Ok(())
    }
}
