//! Configuration module for Warden.

mod app_config;
mod helpers;
mod http_retry;

pub use app_config::{
    AppConfig, ChannelConfig, ChannelKind, ConfigError, EmailChannelConfig, RouteConfig,
    ServiceConfig, TelegramChannelConfig, WatchdogConfig, WebhookChannelConfig,
};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
