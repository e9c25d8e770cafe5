use std::{
    collections::{HashMap, HashSet},
    path::Path,
    time::Duration,
};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::{deserialize_duration_from_seconds, HttpRetryConfig};
use crate::models::{CheckRule, Severity};

/// Provides the default value for shutdown_timeout_secs.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Provides the default value for probe_timeout_secs.
fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> usize {
    5
}

fn default_smtp_port() -> u16 {
    587
}

/// Provides the default value for repeat_interval_secs.
fn default_repeat_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_min_severity() -> Severity {
    Severity::Warn
}

/// Errors raised while loading or validating the configuration file.
///
/// All of these are fatal to process startup: the core never sees an
/// invalid service, channel or route.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or deserialized.
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    /// The configuration lists no services.
    #[error("no services configured")]
    NoServices,

    /// A service has an empty name.
    #[error("service name cannot be empty")]
    EmptyServiceName,

    /// Two services share a name.
    #[error("duplicate service name '{0}'")]
    DuplicateService(String),

    /// A service URL failed to parse.
    #[error("service '{0}': invalid url '{1}': {2}")]
    InvalidUrl(String, String, url::ParseError),

    /// A service's polling interval is below the minimum.
    #[error("service '{0}': interval must be at least 1s")]
    IntervalTooShort(String),

    /// A service lists no checks.
    #[error("service '{0}' has no checks")]
    NoChecks(String),

    /// A check's fields are invalid.
    #[error("service '{0}': {1}")]
    InvalidCheck(String, String),

    /// A channel has an empty name.
    #[error("channel name cannot be empty")]
    EmptyChannelName,

    /// Two channels share a name.
    #[error("duplicate channel name '{0}'")]
    DuplicateChannel(String),

    /// A route lists no services.
    #[error("route for channel '{0}' lists no services")]
    EmptyRoute(String),

    /// A route references a channel that is not configured.
    #[error("route references unknown channel '{0}'")]
    UnknownChannel(String),

    /// A route references a service that is not configured.
    #[error("route references unknown service '{0}'")]
    UnknownService(String),
}

/// Application configuration for Warden: watchdog settings, the monitored
/// services, the notification channels, and the routes binding them.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Scheduler and probe settings.
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// The monitored services.
    pub services: Vec<ServiceConfig>,

    /// The configured notification channels.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    /// The routes binding services to channels.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Retry policy for notification delivery HTTP requests.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,
}

/// Scheduler and probe client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// The maximum time to wait for graceful shutdown.
    #[serde(
        rename = "shutdown_timeout_secs",
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub shutdown_timeout: Duration,

    /// Per-request probe timeout; bounds how long a hung endpoint can
    /// occupy its task.
    #[serde(
        rename = "probe_timeout_secs",
        default = "default_probe_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub probe_timeout: Duration,

    /// Whether probes follow HTTP redirects.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Redirect ceiling when `follow_redirects` is set.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: default_shutdown_timeout(),
            probe_timeout: default_probe_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// One monitored service as declared in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name.
    pub name: String,

    /// The URL to probe.
    pub url: String,

    /// Seconds between polling ticks; minimum 1.
    #[serde(rename = "interval_secs", deserialize_with = "deserialize_duration_from_seconds")]
    pub interval: Duration,

    /// The checks evaluated against every probe of this service.
    #[serde(default)]
    pub checks: Vec<CheckRule>,
}

/// One notification channel: a unique name plus its type-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Unique channel name, referenced by routes.
    pub name: String,

    /// The channel type and its settings.
    #[serde(flatten)]
    pub kind: ChannelKind,
}

/// Type-specific channel settings, tagged by `type` in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelKind {
    /// JSON POST to an HTTP endpoint.
    Webhook(WebhookChannelConfig),
    /// Plain-text email over SMTP.
    Email(EmailChannelConfig),
    /// Telegram Bot API message.
    Telegram(TelegramChannelConfig),
    /// Print to standard output.
    Stdout,
}

/// Settings for a webhook channel.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChannelConfig {
    /// The endpoint receiving the JSON event.
    pub url: Url,

    /// Optional HMAC-SHA256 signing secret.
    #[serde(default)]
    pub secret: Option<String>,

    /// Extra headers to send with every delivery.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Settings for an email channel.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailChannelConfig {
    /// SMTP relay host.
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Optional SMTP username; credentials are used only when both
    /// username and password are set.
    #[serde(default)]
    pub username: Option<String>,

    /// Optional SMTP password.
    #[serde(default)]
    pub password: Option<String>,

    /// Sender address.
    pub from: String,

    /// Recipient addresses.
    pub to: Vec<String>,
}

/// Settings for a Telegram channel.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChannelConfig {
    /// The bot token issued by BotFather.
    pub bot_token: String,

    /// The chat the bot posts into.
    pub chat_id: i64,
}

/// One routing rule binding a set of services to a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Names of the services this route covers.
    pub services: Vec<String>,

    /// Name of the channel alerts are delivered to.
    pub channel: String,

    /// Severity floor; outcomes aggregating below it never notify.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    /// When set, unchanged outcomes re-notify only after the repeat
    /// interval.
    #[serde(default)]
    pub only_on_change: bool,

    /// Whether a transition back to Ok notifies.
    #[serde(default)]
    pub notify_on_recovery: bool,

    /// Heartbeat interval for re-firing an unchanged failing state.
    #[serde(
        rename = "repeat_interval_secs",
        default = "default_repeat_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub repeat_interval: Duration,
}

impl AppConfig {
    /// Loads and validates the configuration from a TOML file, with
    /// `WARDEN__`-prefixed environment variables taking precedence.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("WARDEN").separator("__"))
            .build()?;
        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Loads and validates the configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings =
            Config::builder().add_source(File::from_str(raw, FileFormat::Toml)).build()?;
        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validates the cross-cutting invariants the core assumes: unique
    /// non-empty names, sane intervals, per-check field rules, and route
    /// references that resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let mut service_names = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(ConfigError::EmptyServiceName);
            }
            if !service_names.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
            if let Err(e) = Url::parse(&service.url) {
                return Err(ConfigError::InvalidUrl(service.name.clone(), service.url.clone(), e));
            }
            if service.interval < Duration::from_secs(1) {
                return Err(ConfigError::IntervalTooShort(service.name.clone()));
            }
            if service.checks.is_empty() {
                return Err(ConfigError::NoChecks(service.name.clone()));
            }
            for check in &service.checks {
                validate_check(check)
                    .map_err(|msg| ConfigError::InvalidCheck(service.name.clone(), msg))?;
            }
        }

        let mut channel_names = HashSet::new();
        for channel in &self.channels {
            if channel.name.is_empty() {
                return Err(ConfigError::EmptyChannelName);
            }
            if !channel_names.insert(channel.name.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.name.clone()));
            }
        }

        for route in &self.routes {
            if route.services.is_empty() {
                return Err(ConfigError::EmptyRoute(route.channel.clone()));
            }
            if !channel_names.contains(route.channel.as_str()) {
                return Err(ConfigError::UnknownChannel(route.channel.clone()));
            }
            for service in &route.services {
                if !service_names.contains(service.as_str()) {
                    return Err(ConfigError::UnknownService(service.clone()));
                }
            }
        }

        Ok(())
    }
}

fn validate_check(check: &CheckRule) -> Result<(), String> {
    match check {
        CheckRule::StatusCode { expected } => {
            if *expected == 0 {
                return Err("status_code: expected must be greater than 0".to_string());
            }
        }
        CheckRule::BodyContains { substring } => {
            if substring.is_empty() {
                return Err("body_contains: substring must be non-empty".to_string());
            }
        }
        CheckRule::Header { name, value } => {
            if name.is_empty() {
                return Err("header: header name must be non-empty".to_string());
            }
            if value.is_empty() {
                return Err("header: header value must be non-empty".to_string());
            }
        }
        CheckRule::JsonField { path, expected } => {
            if path.is_empty() {
                return Err("json_field: path must be non-empty".to_string());
            }
            if expected.is_null() {
                return Err("json_field: expected value cannot be null".to_string());
            }
        }
        CheckRule::MaxLatency { threshold } => {
            if threshold.is_zero() {
                return Err("max_latency: max_latency_ms must be greater than 0".to_string());
            }
        }
        CheckRule::SslExpiry { warn_days, crit_days } => {
            if *crit_days <= 0 {
                return Err("ssl_not_expired: crit_days must be greater than 0".to_string());
            }
            if *warn_days <= 0 {
                return Err("ssl_not_expired: warn_days must be greater than 0".to_string());
            }
            if crit_days > warn_days {
                return Err(
                    "ssl_not_expired: warn_days must be greater than or equal to crit_days"
                        .to_string(),
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [[services]]
        name = "site"
        url = "https://example.com"
        interval_secs = 60

          [[services.checks]]
          type = "status_code"
          expected = 200

          [[services.checks]]
          type = "ssl_not_expired"
          warn_days = 14
          crit_days = 7

        [[channels]]
        name = "ops"
        type = "webhook"
        url = "https://hooks.example.com/x"

        [[routes]]
        services = ["site"]
        channel = "ops"
        min_severity = "warn"
        only_on_change = true
        notify_on_recovery = true
        repeat_interval_secs = 300
    "#;

    #[test]
    fn parses_a_complete_config() {
        let config = AppConfig::from_toml_str(VALID).unwrap();
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].checks.len(), 2);
        assert_eq!(config.services[0].interval, Duration::from_secs(60));
        assert_eq!(config.channels.len(), 1);
        assert!(matches!(config.channels[0].kind, ChannelKind::Webhook(_)));
        let route = &config.routes[0];
        assert_eq!(route.min_severity, Severity::Warn);
        assert!(route.only_on_change);
        assert_eq!(route.repeat_interval, Duration::from_secs(300));
    }

    #[test]
    fn watchdog_defaults_apply() {
        let config = AppConfig::from_toml_str(VALID).unwrap();
        assert_eq!(config.watchdog.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.watchdog.probe_timeout, Duration::from_secs(5));
        assert!(config.watchdog.follow_redirects);
    }

    #[test]
    fn rejects_empty_service_list() {
        let result = AppConfig::from_toml_str("services = []");
        assert!(matches!(result, Err(ConfigError::NoServices)));
    }

    #[test]
    fn rejects_duplicate_service_names() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 10
              [[services.checks]]
              type = "status_code"
              expected = 200

            [[services]]
            name = "a"
            url = "http://y"
            interval_secs = 10
              [[services.checks]]
              type = "status_code"
              expected = 200
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::DuplicateService(name)) if name == "a"
        ));
    }

    #[test]
    fn rejects_sub_second_interval() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 0
              [[services.checks]]
              type = "status_code"
              expected = 200
        "#;
        assert!(matches!(AppConfig::from_toml_str(raw), Err(ConfigError::IntervalTooShort(_))));
    }

    #[test]
    fn rejects_service_without_checks() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 10
        "#;
        assert!(matches!(AppConfig::from_toml_str(raw), Err(ConfigError::NoChecks(_))));
    }

    #[test]
    fn rejects_inverted_ssl_windows() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "https://x"
            interval_secs = 10
              [[services.checks]]
              type = "ssl_not_expired"
              warn_days = 7
              crit_days = 14
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::InvalidCheck(_, msg)) if msg.contains("warn_days")
        ));
    }

    #[test]
    fn rejects_route_to_unknown_channel() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 10
              [[services.checks]]
              type = "status_code"
              expected = 200

            [[routes]]
            services = ["a"]
            channel = "nowhere"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::UnknownChannel(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn rejects_route_to_unknown_service() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 10
              [[services.checks]]
              type = "status_code"
              expected = 200

            [[channels]]
            name = "out"
            type = "stdout"

            [[routes]]
            services = ["ghost"]
            channel = "out"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::UnknownService(name)) if name == "ghost"
        ));
    }

    #[test]
    fn parses_every_channel_kind() {
        let raw = r#"
            [[services]]
            name = "a"
            url = "http://x"
            interval_secs = 10
              [[services.checks]]
              type = "status_code"
              expected = 200

            [[channels]]
            name = "hook"
            type = "webhook"
            url = "https://hooks.example.com/x"
            secret = "s3cret"

            [[channels]]
            name = "mail"
            type = "email"
            smtp_host = "smtp.example.com"
            from = "warden@example.com"
            to = ["ops@example.com"]

            [[channels]]
            name = "tg"
            type = "telegram"
            bot_token = "123:abc"
            chat_id = -100123

            [[channels]]
            name = "console"
            type = "stdout"
        "#;
        let config = AppConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.channels.len(), 4);
        assert!(matches!(config.channels[1].kind, ChannelKind::Email(ref e) if e.smtp_port == 587));
        assert!(
            matches!(config.channels[2].kind, ChannelKind::Telegram(ref t) if t.chat_id == -100123)
        );
        assert!(matches!(config.channels[3].kind, ChannelKind::Stdout));
    }
}
