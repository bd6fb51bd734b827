//! Booking client configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Default base URL of the B2C booking platform.
pub const DEFAULT_BASE_URL: &str = "https://platform.yclients.com";

/// Default login endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://api.yclients.com/api/v1/auth";

/// Value of the `X-YCLIENTS-Application-Platform` header.
pub const DEFAULT_PLATFORM: &str = "rust-client";

/// Lifetime the platform grants a user token.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// How long before expiry a token is considered stale.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`BookingClient`](crate::BookingClient).
#[derive(Clone)]
pub struct BookingConfig {
    /// Base URL for the availability endpoints.
    pub base_url: Url,
    /// Full URL of the login endpoint.
    pub auth_url: Url,
    /// Account login (phone or email).
    pub login: String,
    /// Account password.
    pub password: String,
    /// Partner token issued to the integration.
    pub partner_token: String,
    /// HTTP timeout for every call.
    pub timeout: Duration,
    /// Token lifetime granted by the platform.
    pub token_lifetime: Duration,
    /// Safety margin subtracted from the lifetime.
    pub refresh_margin: Duration,
    /// Platform identifier sent with every listing call.
    pub platform: String,
}

impl BookingConfig {
    /// Creates a configuration with the given credentials and defaults for the rest.
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        partner_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            auth_url: Url::parse(DEFAULT_AUTH_URL).expect("default auth URL is valid"),
            login: login.into(),
            password: password.into(),
            partner_token: partner_token.into(),
            timeout: DEFAULT_TIMEOUT,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }

    /// Sets the base URL for the availability endpoints.
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    /// Sets the login endpoint.
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the token lifetime and refresh margin.
    pub fn with_token_lifetime(mut self, lifetime: Duration, margin: Duration) -> Self {
        self.token_lifetime = lifetime;
        self.refresh_margin = margin;
        self
    }

    /// Sets the platform header value.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// True if all three credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.login.is_empty() && !self.password.is_empty() && !self.partner_token.is_empty()
    }

    /// How long a fresh token is used before it is refreshed.
    pub fn effective_lifetime(&self) -> Duration {
        self.token_lifetime.saturating_sub(self.refresh_margin)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.login.is_empty() {
            return Err("login is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        if self.partner_token.is_empty() {
            return Err("partner token is required");
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero");
        }
        if self.refresh_margin >= self.token_lifetime {
            return Err("refresh margin must be shorter than the token lifetime");
        }
        Ok(())
    }
}

impl fmt::Debug for BookingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingConfig")
            .field("base_url", &self.base_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("login", &self.login)
            .field("password", &"***")
            .field("partner_token", &"***")
            .field("timeout", &self.timeout)
            .field("token_lifetime", &self.token_lifetime)
            .field("refresh_margin", &self.refresh_margin)
            .field("platform", &self.platform)
            .finish()
    }
}
