//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod prune;
pub mod run;
pub mod slots;
pub mod subscribers;

use slotwatch_booking::BookingClient;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds the booking client from configuration.
pub(crate) fn booking_client(config: &ClientConfig) -> ClientResult<BookingClient> {
    let booking = config
        .yclients
        .to_booking_config()
        .map_err(ClientError::Config)?;
    Ok(BookingClient::new(booking)?)
}
