//! Configuration loaded from a YAML file and the environment.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{Config as ConfigLib, ConfigBuilder, File, FileFormat};
use chrono::FixedOffset;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SALON_CONFIG";

/// File looked up in the working directory when `SALON_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Keys that can be overridden with `APP_<SECTION>_<KEY>`.
const OVERRIDABLE: &[(&str, &str)] = &[
    ("app", "env"),
    ("app", "timezone"),
    ("app", "payment_base_url"),
    ("telegram", "token"),
    ("telegram", "admin_chat_id"),
    ("telegram", "request_timeout_sec"),
    ("telegram", "api_url"),
    ("http", "addr"),
    ("postgres", "dsn"),
    ("metrics", "enabled"),
    ("dispatcher", "max_workers"),
    ("dispatcher", "idle_secs"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub telegram: TelegramSection,
    pub http: HttpSection,
    pub postgres: PostgresSection,
    pub metrics: MetricsSection,
    pub dispatcher: DispatcherSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// `dev` turns on debug logs.
    pub env: String,
    /// Fixed UTC offset such as `+03:00`, used for display and months.
    pub timezone: String,
    /// Base of the payment link in invoice messages.
    pub payment_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    pub token: SecretString,
    pub admin_chat_id: i64,
    /// Long-poll timeout.
    pub request_timeout_sec: u64,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSection {
    pub dsn: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherSection {
    /// Handlers allowed to run at once across all chats.
    pub max_workers: usize,
    /// Seconds a chat queue may sit empty before it is dropped.
    pub idle_secs: u64,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Sources, later ones winning:
    ///
    /// | Source | Notes |
    /// |--------|-------|
    /// | built-in defaults | see [`AppConfig::from_builder`] |
    /// | `$SALON_CONFIG` or `./config.yaml` | the latter is optional |
    /// | `APP_<SECTION>_<KEY>` | e.g. `APP_POSTGRES_DSN`, `APP_HTTP_ADDR` |
    /// | `TELEGRAM_TOKEN`, `ADMIN_CHAT_ID` | bare variables |
    ///
    /// The result is validated before it is returned.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigLib::builder();
        let builder = match env::var(CONFIG_ENV_VAR) {
            Ok(path) => builder.add_source(File::new(&path, FileFormat::Yaml).required(true)),
            Err(_) => {
                builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false))
            }
        };
        Self::from_builder(builder, |key| env::var(key).ok())
    }

    /// Apply defaults and overrides to `builder`, then deserialize and validate.
    pub fn from_builder<F>(
        builder: ConfigBuilder<DefaultState>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = builder
            .set_default("app.env", "prod")?
            .set_default("app.timezone", "+00:00")?
            .set_default("app.payment_base_url", "http://localhost:8080")?
            .set_default("telegram.token", "")?
            .set_default("telegram.admin_chat_id", 0)?
            .set_default("telegram.request_timeout_sec", 30)?
            .set_default("telegram.api_url", telegram::DEFAULT_API_URL)?
            .set_default("http.addr", "0.0.0.0:8080")?
            .set_default("postgres.dsn", "")?
            .set_default("metrics.enabled", false)?
            .set_default("dispatcher.max_workers", 16)?
            .set_default("dispatcher.idle_secs", 300)?;

        for (section, key) in OVERRIDABLE {
            let var = format!("APP_{}_{}", section.to_uppercase(), key.to_uppercase());
            builder = builder.set_override_option(format!("{section}.{key}"), env(&var))?;
        }
        builder = builder
            .set_override_option("telegram.token", env("TELEGRAM_TOKEN"))?
            .set_override_option("telegram.admin_chat_id", env("ADMIN_CHAT_ID"))?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a running bot cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.telegram.admin_chat_id == 0 {
            return Err(ConfigError::MissingAdminChat);
        }
        if self.postgres.dsn.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingDsn);
        }
        if self.dispatcher.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.addr()?;
        self.offset()?;
        Ok(())
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http
            .addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(self.http.addr.clone()))
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_offset(&self.app.timezone)
            .ok_or_else(|| ConfigError::InvalidTimezone(self.app.timezone.clone()))
    }

    pub fn is_dev(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("dev")
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.is_dev() {
            "debug"
        } else {
            "info"
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.request_timeout_sec)
    }

    pub fn token(&self) -> &str {
        self.telegram.token.expose_secret()
    }

    pub fn dsn(&self) -> &str {
        self.postgres.dsn.expose_secret()
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.dispatcher.idle_secs)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH`, `Z` or `UTC`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("telegram.token is required (or TELEGRAM_TOKEN)")]
    MissingToken,

    #[error("telegram.admin_chat_id is required (or ADMIN_CHAT_ID)")]
    MissingAdminChat,

    #[error("postgres.dsn is required")]
    MissingDsn,

    #[error("dispatcher.max_workers must be at least 1")]
    NoWorkers,

    #[error("invalid http.addr: {0}")]
    InvalidAddr(String),

    #[error("invalid app.timezone: {0}")]
    InvalidTimezone(String),
}
