//! Telegram channel: delivers alerts through the Bot API.

use reqwest_middleware::ClientWithMiddleware;

use super::{format_event, NotificationError, Notifier};
use crate::models::AlertEvent;

/// Delivers alert events as Telegram messages via `sendMessage`.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: i64,
    client: ClientWithMiddleware,
}

impl TelegramNotifier {
    /// Creates a Telegram notifier for one bot token and chat.
    pub fn new(bot_token: String, chat_id: i64, client: ClientWithMiddleware) -> Self {
        Self { bot_token, chat_id, client }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": format_event(event),
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Delivery(format!(
                "telegram API returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
