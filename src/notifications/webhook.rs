//! Generic webhook channel: POSTs the alert event as JSON, optionally
//! signing the payload with HMAC-SHA256.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use url::Url;

use super::{NotificationError, Notifier};
use crate::models::AlertEvent;

type HmacSha256 = Hmac<Sha256>;

/// Delivers alert events to an HTTP endpoint as JSON.
pub struct WebhookNotifier {
    url: Url,
    secret: Option<String>,
    extra_headers: HashMap<String, String>,
    client: ClientWithMiddleware,
}

impl WebhookNotifier {
    /// Creates a webhook notifier. The client should carry the retry
    /// middleware from [`crate::http_client::create_retryable_http_client`].
    pub fn new(
        url: Url,
        secret: Option<String>,
        extra_headers: HashMap<String, String>,
        client: ClientWithMiddleware,
    ) -> Result<Self, NotificationError> {
        // An empty secret would silently produce a weak signature.
        if secret.as_deref() == Some("") {
            return Err(NotificationError::Config("webhook secret cannot be empty".to_string()));
        }
        Ok(Self { url, secret, extra_headers, client })
    }

    fn sign_payload(
        &self,
        secret: &str,
        payload: &serde_json::Value,
        timestamp_millis: i64,
    ) -> Result<String, NotificationError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotificationError::Config(format!("invalid webhook secret: {e}")))?;

        let serialized = serde_json::to_string(payload)
            .map_err(|e| NotificationError::Delivery(format!("failed to serialize payload: {e}")))?;
        mac.update(format!("{serialized}{timestamp_millis}").as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn build_headers(
        &self,
        payload: &serde_json::Value,
    ) -> Result<HeaderMap, NotificationError> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| NotificationError::Config(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| NotificationError::Config(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        if let Some(secret) = &self.secret {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let signature = self.sign_payload(secret, payload, timestamp)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature)
                    .map_err(|e| NotificationError::Delivery(format!("invalid signature: {e}")))?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp.to_string())
                    .map_err(|e| NotificationError::Delivery(format!("invalid timestamp: {e}")))?,
            );
        }

        Ok(headers)
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let payload = serde_json::to_value(event)
            .map_err(|e| NotificationError::Delivery(format!("failed to serialize event: {e}")))?;
        let headers = self.build_headers(&payload)?;

        let response = self
            .client
            .post(self.url.clone())
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Delivery(format!(
                "webhook returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
