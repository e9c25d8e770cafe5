//! SMTP channel backed by lettre's async transport.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{format_event, NotificationError, Notifier};
use crate::{config::EmailChannelConfig, models::AlertEvent};

/// Delivers alert events as plain-text email over SMTP.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Builds the SMTP transport and parses the configured addresses.
    pub fn new(config: &EmailChannelConfig) -> Result<Self, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotificationError::Config(format!("invalid SMTP relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Config(format!("invalid from address: {e}")))?;
        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| NotificationError::Config(format!("invalid recipient: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { transport: builder.build(), from, to })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let subject = format!("[{}] {}", event.severity, event.service_name);
        let body = format_event(event);

        for recipient in &self.to {
            let message = Message::builder()
                .from(self.from.clone())
                .to(recipient.clone())
                .subject(subject.clone())
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())
                .map_err(|e| NotificationError::Delivery(format!("failed to build email: {e}")))?;

            self.transport
                .send(message)
                .await
                .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        }
        Ok(())
    }
}
