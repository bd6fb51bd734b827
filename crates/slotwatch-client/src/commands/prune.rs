//! Seen-slot store cleanup.

use std::time::Duration;

use slotwatch_server::{SqliteSeenStore, SeenSlots};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Drop records older than `days` (or the configured retention).
///
/// Safe to run while the poller is up: both share the database file.
pub async fn prune(config: &ClientConfig, days: Option<u64>) -> ClientResult<()> {
    let retention = match days {
        Some(days) => Duration::from_secs(days.saturating_mul(24 * 60 * 60)),
        None => config.polling.retention(),
    };
    let store = SqliteSeenStore::open(config.storage.seen_path()).await?;
    let removed = store.prune(retention).await?;
    let remaining = store.len().await?;
    println!(
        "Removed {} seen slot(s) older than {} day(s), {} remain.",
        removed,
        retention.as_secs() / 86400,
        remaining
    );
    Ok(())
}
