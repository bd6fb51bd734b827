//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the poller.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (subscriber file, PID file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A JSON state file exists but could not be decoded.
    #[error("Store format error in {path}: {message}")]
    StoreFormat { path: String, message: String },

    /// The seen-slot database failed.
    #[error("Store error: {message}")]
    Store { message: String },

    /// Delivery to a notification channel failed.
    #[error("Sink error: {message}")]
    Sink { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Another poller already holds the PID file.
    #[error("Poller is already running (PID file exists: {path})")]
    AlreadyRunning { path: String },
}

impl ServerError {
    /// Creates a store format error.
    pub fn store_format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an already running error.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }

    /// Stable snake_case name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::StoreFormat { .. } => "store_format",
            Self::Store { .. } => "store",
            Self::Sink { .. } => "sink",
            Self::Config { .. } => "config",
            Self::AlreadyRunning { .. } => "already_running",
        }
    }
}
