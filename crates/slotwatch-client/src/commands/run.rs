//! Run command: starts the poller in the foreground.
//!
//! This module wires the poller together:
//! - Startup check against the booking API (exits non-zero on failure)
//! - Instance lock (prevents two pollers on one store)
//! - Seen-slot store, subscriber list and Telegram sink
//! - Prometheus exporter (unless disabled or running once)
//! - Signal handler (SIGTERM/SIGINT for shutdown)
//! - Scheduler (periodic discovery ticks)

use std::sync::Arc;

use tracing::{info, warn};

use slotwatch_booking::{BookingClient, BookingResult};
use slotwatch_server::{
    DiscoveryConfig, InstanceLock, Scheduler, SchedulerConfig, SlotDiscovery, SqliteSeenStore,
    SubscriberStore, TelegramSink, install_signal_handler, telemetry,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Starts the poller. Blocks until SIGTERM/SIGINT, or after one tick with `once`.
pub async fn run(config: &ClientConfig, once: bool) -> ClientResult<()> {
    let discovery_config = config.discovery_config();
    let client = Arc::new(super::booking_client(config)?);

    let status = client.status().await;
    info!(
        auth_configured = status.auth_configured,
        base_url = %status.base_url,
        location_id = discovery_config.location_id,
        service_ids = ?discovery_config.service_ids,
        timezone = %discovery_config.timezone,
        interval_secs = discovery_config.interval.as_secs(),
        "booking client initialized"
    );

    self_check(&client, &discovery_config)
        .await
        .map_err(ClientError::SelfCheck)?;

    let telegram = config
        .telegram
        .to_telegram_config()
        .map_err(ClientError::Config)?;

    let seen_path = config.storage.seen_path();
    let _lock = InstanceLock::acquire(InstanceLock::path_for(&seen_path))?;
    let store = Arc::new(SqliteSeenStore::open(&seen_path).await?);
    let subscribers = Arc::new(SubscriberStore::new(config.storage.subscribers_path()));

    if !once && let Some(listen) = config.metrics.listen_addr().map_err(ClientError::Config)? {
        telemetry::install_exporter(listen)?;
    }
    telemetry::register_metrics();

    if let Some((seen_slots, subs)) = record_store_gauges(&store, &subscribers).await {
        info!(
            seen_slots,
            subscribers = subs,
            store = %seen_path.display(),
            "store statistics"
        );
    }

    let sink = Arc::new(TelegramSink::new(telegram, subscribers.clone())?);

    let discovery = Arc::new(SlotDiscovery::new(
        discovery_config.clone(),
        client,
        store.clone(),
        sink,
        Arc::new(config.names()),
    ));

    let cancel = install_signal_handler();

    if once {
        let report = discovery.run_tick(&cancel).await;
        cancel.cancel();
        info!(
            checks = report.checks,
            new_slots = report.new_slots,
            errors = report.errors,
            "single tick finished"
        );
        return Ok(());
    }

    let scheduler = Scheduler::new(SchedulerConfig::new(discovery_config.interval));
    info!("poller started");
    scheduler
        .run(cancel, move |token| {
            let discovery = discovery.clone();
            let store = store.clone();
            let subscribers = subscribers.clone();
            async move {
                let report = discovery.run_tick(&token).await;
                record_store_gauges(&store, &subscribers).await;
                report
            }
        })
        .await;

    info!("poller stopped");
    Ok(())
}

/// Sets the store gauges; returns `(seen slots, subscribers)` when both were read.
async fn record_store_gauges(
    store: &SqliteSeenStore,
    subscribers: &SubscriberStore,
) -> Option<(usize, usize)> {
    match (store.len().await, subscribers.list().await) {
        (Ok(seen_slots), Ok(subs)) => {
            telemetry::set_seen_slots(seen_slots);
            telemetry::set_active_subscribers(subs.len());
            Some((seen_slots, subs.len()))
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "failed to read store statistics");
            None
        }
    }
}

/// Lists staff for the first service, which forces a login.
///
/// Without services there is nothing to search, so the check is skipped.
async fn self_check(client: &BookingClient, config: &DiscoveryConfig) -> BookingResult<()> {
    let Some(&service_id) = config.service_ids.first() else {
        warn!("no service ids configured, skipping authentication check");
        return Ok(());
    };
    info!(service_id, "checking booking API authentication");
    client.list_staff(config.location_id, service_id).await?;
    info!("booking API authentication succeeded");
    Ok(())
}
