//! Client configuration.
//!
//! All settings live in a single `config.toml`, by default
//! `~/.config/slotwatch/config.toml`. Environment variables override the
//! file (see [`ClientConfig::apply_env_overrides`]).
//!
//! Credential values support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use slotwatch_booking::BookingConfig;
use slotwatch_core::StaticNames;
use slotwatch_server::{DEFAULT_LOCATION_ID, DEFAULT_TIMEZONE, DiscoveryConfig, TelegramConfig};

use crate::secret;

/// Default polling interval written to a fresh config, in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: i64 = 60;

/// Default seen-slot retention, in days.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Default Prometheus listen address.
pub const DEFAULT_METRICS_LISTEN: &str = "0.0.0.0:9090";

const SEEN_FILE: &str = "seen_slots.db";
const SUBSCRIBERS_FILE: &str = "subscribers.json";

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the slotwatch binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging.
    pub debug: bool,

    /// Booking platform account and search space.
    pub yclients: YclientsSettings,

    /// Telegram delivery.
    pub telegram: TelegramSettings,

    /// Poll cadence and time zone.
    pub polling: PollingSettings,

    /// Store file locations.
    pub storage: StorageSettings,

    /// Extra display names for locations and services.
    pub names: NameSettings,

    /// Log output.
    pub logging: LoggingSettings,

    /// Prometheus exporter.
    pub metrics: MetricsSettings,
}

/// Booking platform settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YclientsSettings {
    /// Account login (supports `pass::` and `env::` prefixes).
    pub login: Option<String>,

    /// Account password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,

    /// Partner token (supports `pass::` and `env::` prefixes).
    pub partner_token: Option<String>,

    /// Location (company) searched for slots.
    pub company_id: u64,

    /// Services searched, in order.
    pub service_ids: Vec<u64>,

    /// Override for the availability endpoint base URL.
    pub base_url: Option<String>,

    /// Override for the login endpoint.
    pub auth_url: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout: u64,
}

impl Default for YclientsSettings {
    fn default() -> Self {
        Self {
            login: None,
            password: None,
            partner_token: None,
            company_id: DEFAULT_LOCATION_ID,
            service_ids: Vec::new(),
            base_url: None,
            auth_url: None,
            timeout: 10,
        }
    }
}

impl fmt::Debug for YclientsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YclientsSettings")
            .field("login", &self.login.as_deref().map(secret::mask))
            .field("password", &self.password.as_deref().map(|_| "***"))
            .field(
                "partner_token",
                &self.partner_token.as_deref().map(secret::mask),
            )
            .field("company_id", &self.company_id)
            .field("service_ids", &self.service_ids)
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl YclientsSettings {
    /// Builds the booking client configuration, resolving secret references.
    pub fn to_booking_config(&self) -> Result<BookingConfig, String> {
        let login = resolve_required("yclients.login", self.login.as_deref())?;
        let password = resolve_required("yclients.password", self.password.as_deref())?;
        let partner_token =
            resolve_required("yclients.partner_token", self.partner_token.as_deref())?;

        let mut config = BookingConfig::new(login, password, partner_token)
            .with_timeout(Duration::from_secs(self.timeout));
        if let Some(ref raw) = self.base_url {
            config = config.with_base_url(parse_url("yclients.base_url", raw)?);
        }
        if let Some(ref raw) = self.auth_url {
            config = config.with_auth_url(parse_url("yclients.auth_url", raw)?);
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Telegram settings.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token (supports `pass::` and `env::` prefixes).
    pub bot_token: Option<String>,

    /// Override for the Bot API base URL.
    pub api_base: Option<String>,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_deref().map(secret::mask))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TelegramSettings {
    /// Builds the sink configuration, resolving the token reference.
    pub fn to_telegram_config(&self) -> Result<TelegramConfig, String> {
        let token = resolve_required("telegram.bot_token", self.bot_token.as_deref())?;
        let mut config = TelegramConfig::new(token);
        if let Some(ref raw) = self.api_base {
            config = config.with_api_base(parse_url("telegram.api_base", raw)?);
        }
        Ok(config)
    }
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Seconds between ticks. Zero or negative falls back to the default.
    pub interval: i64,

    /// IANA time zone for dates and messages.
    pub timezone: String,

    /// Days a seen slot is remembered.
    pub retention_days: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CHECK_INTERVAL_SECS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl PollingSettings {
    /// Retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(24 * 60 * 60))
    }
}

/// Store file locations. Unset paths live in the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Seen-slot store.
    pub seen_path: Option<PathBuf>,

    /// Subscriber list.
    pub subscribers_path: Option<PathBuf>,
}

impl StorageSettings {
    /// Path of the seen-slot store.
    pub fn seen_path(&self) -> PathBuf {
        self.seen_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join(SEEN_FILE))
    }

    /// Path of the subscriber list.
    pub fn subscribers_path(&self) -> PathBuf {
        self.subscribers_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join(SUBSCRIBERS_FILE))
    }
}

/// Name tables keyed by id, merged over the built-in ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NameSettings {
    pub locations: HashMap<String, String>,
    pub services: HashMap<String, String>,
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `pretty`, `compact` or `json`. Unset picks per command.
    pub format: Option<String>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Serve `/metrics` while the poller runs.
    pub enabled: bool,

    /// Listen address, e.g. `0.0.0.0:9090`.
    pub listen: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: DEFAULT_METRICS_LISTEN.to_string(),
        }
    }
}

impl MetricsSettings {
    /// Address to serve on, or `None` when the exporter is disabled.
    pub fn listen_addr(&self) -> Result<Option<SocketAddr>, String> {
        if !self.enabled {
            return Ok(None);
        }
        self.listen
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid metrics.listen: {}", self.listen))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotwatch")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotwatch")
    }

    /// Applies environment overrides on top of the file.
    ///
    /// | Variable | Setting |
    /// |---|---|
    /// | `YCLIENTS_LOGIN` | `yclients.login` |
    /// | `YCLIENTS_PASSWORD` | `yclients.password` |
    /// | `YCLIENTS_PARTNER_TOKEN` | `yclients.partner_token` |
    /// | `YCLIENTS_COMPANY_ID` | `yclients.company_id` |
    /// | `YCLIENTS_SERVICE_IDS` | `yclients.service_ids` (comma separated) |
    /// | `TELEGRAM_TOKEN` | `telegram.bot_token` |
    /// | `CHECK_INTERVAL_SECONDS` | `polling.interval` |
    /// | `TIMEZONE` | `polling.timezone` |
    /// | `METRICS_LISTEN` | `metrics.listen` |
    ///
    /// Empty variables are ignored. Unparseable service ids are skipped with a
    /// warning; an unparseable company id is an error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("YCLIENTS_LOGIN") {
            self.yclients.login = Some(v);
        }
        if let Some(v) = get("YCLIENTS_PASSWORD") {
            self.yclients.password = Some(v);
        }
        if let Some(v) = get("YCLIENTS_PARTNER_TOKEN") {
            self.yclients.partner_token = Some(v);
        }
        if let Some(v) = get("TELEGRAM_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = get("YCLIENTS_COMPANY_ID") {
            self.yclients.company_id = v
                .parse()
                .map_err(|_| format!("invalid YCLIENTS_COMPANY_ID: {}", v))?;
        }
        if let Some(v) = get("YCLIENTS_SERVICE_IDS") {
            self.yclients.service_ids = parse_service_ids(&v);
        }
        if let Some(v) = get("CHECK_INTERVAL_SECONDS") {
            match v.parse::<i64>() {
                Ok(secs) => self.polling.interval = secs,
                Err(_) => warn!(value = %v, "invalid CHECK_INTERVAL_SECONDS ignored"),
            }
        }
        if let Some(v) = get("TIMEZONE") {
            self.polling.timezone = v;
        }
        if let Some(v) = get("METRICS_LISTEN") {
            self.metrics.listen = v;
        }
        Ok(())
    }

    /// Discovery loop configuration.
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::new(self.yclients.company_id, self.yclients.service_ids.clone())
            .with_interval_secs(self.polling.interval)
            .with_timezone(self.polling.timezone.clone())
            .with_retention(self.polling.retention())
    }

    /// Built-in name tables extended with the configured ones.
    pub fn names(&self) -> StaticNames {
        StaticNames::builtin().extend_from(&self.names.locations, &self.names.services)
    }

    /// Copy with literal secrets masked, for dumps.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.yclients.login = copy.yclients.login.as_deref().map(secret::mask);
        copy.yclients.password = copy.yclients.password.as_deref().map(|v| {
            if secret::is_reference(v) {
                v.to_string()
            } else {
                "***".to_string()
            }
        });
        copy.yclients.partner_token = copy.yclients.partner_token.as_deref().map(secret::mask);
        copy.telegram.bot_token = copy.telegram.bot_token.as_deref().map(secret::mask);
        copy
    }
}

/// Parses a comma-separated id list, skipping (and logging) bad entries.
pub fn parse_service_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = %part, "invalid service id ignored");
                None
            }
        })
        .collect()
}

fn resolve_required(field: &str, raw: Option<&str>) -> Result<String, String> {
    let raw = raw
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{} is not set", field))?;
    secret::resolve(raw).map_err(|e| format!("failed to resolve {}: {}", field, e))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, String> {
    Url::parse(raw).map_err(|e| format!("invalid {}: {}", field, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.yclients.company_id, 780413);
        assert!(config.yclients.service_ids.is_empty());
        assert_eq!(config.polling.interval, 60);
        assert_eq!(config.polling.timezone, "Europe/Moscow");
        assert_eq!(config.polling.retention(), Duration::from_secs(7 * 86400));
        assert_eq!(config.yclients.timeout, 10);
    }

    #[test]
    fn parse_full_file() {
        let config = ClientConfig::parse(
            r#"
            [yclients]
            login = "env::YC_LOGIN"
            password = "pass::yclients/password"
            partner_token = "partner"
            company_id = 12345
            service_ids = [15728488, 100]

            [telegram]
            bot_token = "123:abc"

            [polling]
            interval = 45
            timezone = "Asia/Yekaterinburg"

            [storage]
            seen_path = "/var/lib/slotwatch/seen.db"

            [names.services]
            "100" = "Площадка"
            "#,
        )
        .unwrap();

        assert_eq!(config.yclients.company_id, 12345);
        assert_eq!(config.yclients.service_ids, vec![15728488, 100]);
        assert_eq!(config.polling.interval, 45);
        assert_eq!(
            config.storage.seen_path(),
            PathBuf::from("/var/lib/slotwatch/seen.db")
        );
        assert!(config.storage.subscribers_path().ends_with("slotwatch/subscribers.json"));

        let discovery = config.discovery_config();
        assert_eq!(discovery.location_id, 12345);
        assert_eq!(discovery.interval, Duration::from_secs(45));
        assert_eq!(discovery.timezone, "Asia/Yekaterinburg");

        use slotwatch_core::NameResolver;
        let names = config.names();
        assert_eq!(names.service_name(100), Some("Площадка"));
        assert_eq!(names.location_name(780413), Some("Неваляшка"));
    }

    #[test]
    fn parse_rejects_bad_toml() {
        let err = ClientConfig::parse("[yclients\n").unwrap_err();
        assert!(err.contains("failed to parse config"));
    }

    #[test]
    fn non_positive_interval_uses_loop_default() {
        let mut config = ClientConfig::default();
        config.polling.interval = 0;
        assert_eq!(
            config.discovery_config().interval,
            slotwatch_server::DEFAULT_INTERVAL
        );
        config.polling.interval = -5;
        assert_eq!(
            config.discovery_config().interval,
            slotwatch_server::DEFAULT_INTERVAL
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ClientConfig::parse(
            r#"
            [yclients]
            login = "file-login"
            service_ids = [1]
            "#,
        )
        .unwrap();

        config
            .apply_env_overrides(env(&[
                ("YCLIENTS_LOGIN", "env-login"),
                ("YCLIENTS_PASSWORD", "secret"),
                ("YCLIENTS_PARTNER_TOKEN", "partner"),
                ("TELEGRAM_TOKEN", "123:abc"),
                ("YCLIENTS_COMPANY_ID", "555"),
                ("YCLIENTS_SERVICE_IDS", "10, 20,abc,,30"),
                ("CHECK_INTERVAL_SECONDS", "90"),
                ("TIMEZONE", "Europe/Samara"),
                ("METRICS_LISTEN", "127.0.0.1:9100"),
            ]))
            .unwrap();

        assert_eq!(config.yclients.login.as_deref(), Some("env-login"));
        assert_eq!(config.yclients.password.as_deref(), Some("secret"));
        assert_eq!(config.yclients.partner_token.as_deref(), Some("partner"));
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.yclients.company_id, 555);
        assert_eq!(config.yclients.service_ids, vec![10, 20, 30]);
        assert_eq!(config.polling.interval, 90);
        assert_eq!(config.polling.timezone, "Europe/Samara");
        assert_eq!(config.metrics.listen, "127.0.0.1:9100");
    }

    #[test]
    fn metrics_listen_defaults_and_can_be_disabled() {
        let config = ClientConfig::default();
        assert_eq!(
            config.metrics.listen_addr().unwrap(),
            Some("0.0.0.0:9090".parse().unwrap())
        );
        assert!(config.storage.seen_path().ends_with("slotwatch/seen_slots.db"));

        let config = ClientConfig::parse(
            r#"
            [metrics]
            enabled = false
            listen = "not an address"
            "#,
        )
        .unwrap();
        assert_eq!(config.metrics.listen_addr().unwrap(), None);

        let mut config = ClientConfig::default();
        config.metrics.listen = ":9090".into();
        assert!(config.metrics.listen_addr().is_err());
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = ClientConfig::default();
        config.yclients.login = Some("file-login".into());
        config
            .apply_env_overrides(env(&[("YCLIENTS_LOGIN", "  "), ("TIMEZONE", "")]))
            .unwrap();
        assert_eq!(config.yclients.login.as_deref(), Some("file-login"));
        assert_eq!(config.polling.timezone, "Europe/Moscow");
    }

    #[test]
    fn invalid_company_id_is_an_error() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env_overrides(env(&[("YCLIENTS_COMPANY_ID", "moto")]))
            .unwrap_err();
        assert!(err.contains("YCLIENTS_COMPANY_ID"));
    }

    #[test]
    fn invalid_interval_is_ignored() {
        let mut config = ClientConfig::default();
        config
            .apply_env_overrides(env(&[("CHECK_INTERVAL_SECONDS", "soon")]))
            .unwrap();
        assert_eq!(config.polling.interval, DEFAULT_CHECK_INTERVAL_SECS);
    }

    #[test]
    fn booking_config_requires_credentials() {
        let settings = YclientsSettings {
            login: Some("login".into()),
            password: Some("password".into()),
            ..Default::default()
        };
        let err = settings.to_booking_config().unwrap_err();
        assert!(err.contains("yclients.partner_token"));
    }

    #[test]
    fn booking_config_with_overrides() {
        let settings = YclientsSettings {
            login: Some("login".into()),
            password: Some("password".into()),
            partner_token: Some("partner".into()),
            base_url: Some("http://127.0.0.1:8080".into()),
            timeout: 3,
            ..Default::default()
        };
        let config = settings.to_booking_config().unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.partner_token, "partner");
    }

    #[test]
    fn booking_config_rejects_bad_url() {
        let settings = YclientsSettings {
            login: Some("login".into()),
            password: Some("password".into()),
            partner_token: Some("partner".into()),
            auth_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(settings.to_booking_config().unwrap_err().contains("yclients.auth_url"));
    }

    #[test]
    fn telegram_config_requires_token() {
        let err = TelegramSettings::default().to_telegram_config().unwrap_err();
        assert!(err.contains("telegram.bot_token"));
    }

    #[test]
    fn redacted_masks_literals_and_keeps_references() {
        let mut config = ClientConfig::default();
        config.yclients.login = Some("+79990001122".into());
        config.yclients.password = Some("hunter2".into());
        config.yclients.partner_token = Some("env::YCLIENTS_PARTNER_TOKEN".into());
        config.telegram.bot_token = Some("1234567:ABCDEFG".into());

        let redacted = config.redacted();
        assert_eq!(redacted.yclients.login.as_deref(), Some("+79***122"));
        assert_eq!(redacted.yclients.password.as_deref(), Some("***"));
        assert_eq!(
            redacted.yclients.partner_token.as_deref(),
            Some("env::YCLIENTS_PARTNER_TOKEN")
        );
        assert_eq!(redacted.telegram.bot_token.as_deref(), Some("123***EFG"));

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("ABCDEFG"));
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = ClientConfig::default();
        config.yclients.service_ids = vec![15728488];
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = ClientConfig::parse(&text).unwrap();
        assert_eq!(parsed.yclients.service_ids, vec![15728488]);
    }
}
