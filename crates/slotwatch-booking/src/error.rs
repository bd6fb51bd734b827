//! Error types for booking API operations.

use std::fmt;
use thiserror::Error;

/// The category of a booking API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingErrorCode {
    /// Login failed or the session was rejected.
    AuthenticationFailed,
    /// Credentials were accepted but access was denied (403).
    AuthorizationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// The platform returned a 5xx status.
    ServerError,
    /// The body was not the JSON shape we expect.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// The platform rejected the request (other 4xx).
    BadRequest,
    /// Missing or invalid client configuration.
    ConfigurationError,
    /// Unexpected client state.
    InternalError,
}

impl BookingErrorCode {
    /// Returns true if this error is transient and the call may succeed next tick.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a stable snake_case name, used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for BookingErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error returned by the booking client.
#[derive(Debug, Error)]
pub struct BookingError {
    code: BookingErrorCode,
    message: String,
    /// HTTP status, when the error came from a response.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BookingError {
    /// Creates a new error with the given code and message.
    pub fn new(code: BookingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BookingErrorCode::InternalError, message)
    }

    /// Attaches the HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> BookingErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true for login/session failures.
    pub fn is_auth(&self) -> bool {
        self.code == BookingErrorCode::AuthenticationFailed
    }
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[yclients] {}: {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        Ok(())
    }
}

/// A specialized Result type for booking operations.
pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(BookingErrorCode::NetworkError.is_retryable());
        assert!(BookingErrorCode::RateLimited.is_retryable());
        assert!(BookingErrorCode::ServerError.is_retryable());
        assert!(!BookingErrorCode::AuthenticationFailed.is_retryable());
        assert!(!BookingErrorCode::InvalidResponse.is_retryable());
    }

    #[test]
    fn error_display_includes_status() {
        let err = BookingError::server("boom").with_status(502);
        let display = err.to_string();
        assert!(display.contains("server_error"));
        assert!(display.contains("boom"));
        assert!(display.contains("502"));
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn auth_errors_are_flagged() {
        let err = BookingError::authentication("bad password");
        assert!(err.is_auth());
        assert!(!err.is_retryable());
        assert!(!BookingError::network("x").is_auth());
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("reset");
        let err = BookingError::network("read failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
