//! Assembles the runtime from a validated configuration: channels, routes,
//! services, the prober, and the watchdog that owns them.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use url::Url;

use crate::{
    config::{AppConfig, ChannelKind, ConfigError},
    http_client::create_retryable_http_client,
    models::{AlertRoute, Service},
    notifications::{
        EmailNotifier, NotificationError, Notifier, StdoutNotifier, TelegramNotifier,
        WebhookNotifier,
    },
    probe::{HttpProber, ProbeError},
    routing::RoutingEngine,
    watchdog::Watchdog,
};

/// Errors raised while turning configuration into runtime components.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A notification channel could not be constructed.
    #[error("channel '{0}': {1}")]
    Channel(String, NotificationError),

    /// The probe client could not be constructed.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Builds a ready-to-start [`Watchdog`] from a validated configuration.
pub fn build_watchdog(config: &AppConfig) -> Result<Watchdog, BootstrapError> {
    let services = build_services(config)?;
    let channels = build_channels(config)?;
    let routes = build_routes(config, &channels)?;

    // A service no route covers still polls, but its signal goes nowhere.
    // Surface the gap once at startup; the engine logs it per cycle too.
    for service in &services {
        if !routes.iter().any(|route| route.matches(&service.name)) {
            tracing::warn!(service = %service.name, "no alert route covers service");
        }
    }

    let prober = Arc::new(HttpProber::new(&config.watchdog)?);
    let routing = Arc::new(RoutingEngine::new(routes));
    Ok(Watchdog::new(services, prober, routing))
}

fn build_services(config: &AppConfig) -> Result<Vec<Service>, BootstrapError> {
    config
        .services
        .iter()
        .map(|service| {
            let url = Url::parse(&service.url).map_err(|e| {
                ConfigError::InvalidUrl(service.name.clone(), service.url.clone(), e)
            })?;
            Ok(Service {
                name: service.name.clone(),
                url,
                interval: service.interval,
                rules: service.checks.clone(),
            })
        })
        .collect()
}

fn build_channels(
    config: &AppConfig,
) -> Result<HashMap<String, Arc<dyn Notifier>>, BootstrapError> {
    let delivery_client =
        create_retryable_http_client(&config.http_retry, reqwest::Client::new());

    config
        .channels
        .iter()
        .map(|channel| {
            let notifier: Arc<dyn Notifier> = match &channel.kind {
                ChannelKind::Webhook(cfg) => Arc::new(
                    WebhookNotifier::new(
                        cfg.url.clone(),
                        cfg.secret.clone(),
                        cfg.headers.clone(),
                        delivery_client.clone(),
                    )
                    .map_err(|e| BootstrapError::Channel(channel.name.clone(), e))?,
                ),
                ChannelKind::Email(cfg) => Arc::new(
                    EmailNotifier::new(cfg)
                        .map_err(|e| BootstrapError::Channel(channel.name.clone(), e))?,
                ),
                ChannelKind::Telegram(cfg) => Arc::new(TelegramNotifier::new(
                    cfg.bot_token.clone(),
                    cfg.chat_id,
                    delivery_client.clone(),
                )),
                ChannelKind::Stdout => Arc::new(StdoutNotifier),
            };
            Ok((channel.name.clone(), notifier))
        })
        .collect()
}

fn build_routes(
    config: &AppConfig,
    channels: &HashMap<String, Arc<dyn Notifier>>,
) -> Result<Vec<AlertRoute>, BootstrapError> {
    config
        .routes
        .iter()
        .map(|route| {
            let channel = channels
                .get(&route.channel)
                .ok_or_else(|| ConfigError::UnknownChannel(route.channel.clone()))?;
            Ok(AlertRoute {
                service_names: route.services.iter().cloned().collect(),
                min_severity: route.min_severity,
                only_on_change: route.only_on_change,
                notify_on_recovery: route.notify_on_recovery,
                repeat_interval: route.repeat_interval,
                channel_name: route.channel.clone(),
                channel: Arc::clone(channel),
            })
        })
        .collect()
}
