//! Discovery loop configuration.

use std::time::Duration;

/// Interval used when none (or a non-positive one) is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// How long seen-slot records are kept.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

/// Location polled when none is configured.
pub const DEFAULT_LOCATION_ID: u64 = 780413;

/// Configuration of the slot discovery loop.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Time between tick starts.
    pub interval: Duration,
    /// IANA zone name used for "today" and message formatting.
    pub timezone: String,
    /// Location (company) to search. Zero disables polling.
    pub location_id: u64,
    /// Services to search, in order.
    pub service_ids: Vec<u64>,
    /// Seen-slot retention window.
    pub retention: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timezone: DEFAULT_TIMEZONE.to_string(),
            location_id: DEFAULT_LOCATION_ID,
            service_ids: Vec::new(),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl DiscoveryConfig {
    /// Creates a configuration for the given location and services.
    pub fn new(location_id: u64, service_ids: Vec<u64>) -> Self {
        Self {
            location_id,
            service_ids,
            ..Default::default()
        }
    }

    /// Builder: set interval. A zero interval keeps the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Builder: set interval from a signed number of seconds; `<= 0` keeps the default.
    pub fn with_interval_secs(self, secs: i64) -> Self {
        let secs = u64::try_from(secs).unwrap_or(0);
        self.with_interval(Duration::from_secs(secs))
    }

    /// Builder: set time zone name.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Builder: set retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}
