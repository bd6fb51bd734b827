//! Session token held by the booking client.
//!
//! The token is never persisted; a fresh login is performed whenever there
//! is no token or the current one has entered its refresh margin.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// A user token plus the instants that govern its refresh.
#[derive(Clone)]
pub struct SessionToken {
    value: String,
    /// Once this passes, the token is refreshed before the next call.
    refresh_at: Instant,
    /// Hard expiry as granted by the platform.
    expires_at: Instant,
}

impl SessionToken {
    /// Creates a token issued at `issued_at`.
    pub fn new(
        value: impl Into<String>,
        issued_at: Instant,
        lifetime: Duration,
        margin: Duration,
    ) -> Self {
        Self {
            value: value.into(),
            refresh_at: issued_at + lifetime.saturating_sub(margin),
            expires_at: issued_at + lifetime,
        }
    }

    /// The raw token value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if the token can be used for a call sent at `now`.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.refresh_at
    }

    /// True if the token can be used right now.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    /// Time left before the token must be refreshed.
    pub fn time_to_refresh(&self) -> Duration {
        self.refresh_at.saturating_duration_since(Instant::now())
    }

    /// Time left before the platform considers the token expired.
    pub fn time_to_expiry(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Session state as seen at `now`.
    pub fn state_at(&self, now: Instant) -> SessionState {
        if self.is_fresh_at(now) {
            SessionState::Authenticated
        } else {
            SessionState::Expiring
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"***")
            .field("time_to_refresh", &self.time_to_refresh())
            .finish()
    }
}

/// Authentication state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token has been obtained yet (or the last one was rejected).
    Unauthenticated,
    /// A token is held and outside its refresh margin.
    Authenticated,
    /// A token is held but will be refreshed on the next call.
    Expiring,
}

impl SessionState {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::Expiring => "expiring",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
