//! Configuration commands.

use std::path::Path;

use slotwatch_core::SlotZone;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout, secrets masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration.
///
/// Credentials and the bot token are resolved, so `pass::` and `env::`
/// references are checked too.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config
        .yclients
        .to_booking_config()
        .map_err(|e| ClientError::Config(format!("invalid [yclients] settings: {}", e)))?;
    println!("YCLIENTS credentials are valid.");

    config
        .telegram
        .to_telegram_config()
        .map_err(|e| ClientError::Config(format!("invalid [telegram] settings: {}", e)))?;
    println!("Telegram settings are valid.");

    config.metrics.listen_addr().map_err(ClientError::Config)?;

    if config.yclients.service_ids.is_empty() {
        println!("warning: no service ids configured, the poller will idle");
    }
    if config.yclients.company_id == 0 {
        println!("warning: company_id is 0, the poller will idle");
    }
    if config.polling.interval <= 0 {
        println!(
            "warning: polling.interval {} is not positive, the default is used",
            config.polling.interval
        );
    }
    if SlotZone::try_resolve(&config.polling.timezone).is_none() {
        println!(
            "warning: unknown time zone {:?}, falling back to UTC+3",
            config.polling.timezone
        );
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and data file paths.
pub fn path(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!("seen slots: {}", config.storage.seen_path().display());
    println!("subscribers: {}", config.storage.subscribers_path().display());
    Ok(())
}
