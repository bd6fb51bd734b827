//! Client error types.

use slotwatch_booking::BookingError;
use slotwatch_core::TracingError;
use slotwatch_server::ServerError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a `slotwatch` invocation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Booking API error.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// Store, sink or lock error.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The startup check against the booking API failed.
    #[error("startup check failed: {0}")]
    SelfCheck(#[source] BookingError),

    /// Logging could not be set up.
    #[error("failed to initialize logging: {0}")]
    Tracing(#[from] TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
