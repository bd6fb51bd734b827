//! Client for the YCLIENTS B2C booking platform.
//!
//! - [`BookingApi`] - The seam the discovery loop depends on
//! - [`BookingClient`] - Authenticated HTTP implementation
//! - [`BookingError`] - Error types for booking operations
//!
//! # Flow
//!
//! ```text
//!   list_bookable_staff ──► list_bookable_dates ──► list_bookable_timeslots
//!            │                      │                         │
//!            └──────────────┬───────┴─────────────────────────┘
//!                           ▼
//!                  session token (login when missing or stale)
//!                           │
//!                           ▼
//!              POST /api/v1/b2c/booking/availability/*
//! ```
//!
//! # Example
//!
//! ```ignore
//! use slotwatch_booking::{BookingClient, BookingConfig};
//!
//! let client = BookingClient::new(BookingConfig::new(login, password, partner))?;
//! let staff = client.list_staff(780413, 15728488).await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod response;
pub mod session;

pub use api::{BookingApi, BoxFuture};
pub use client::{BookingClient, ClientStatus};
pub use config::BookingConfig;
pub use error::{BookingError, BookingErrorCode, BookingResult};
pub use session::{SessionState, SessionToken};
