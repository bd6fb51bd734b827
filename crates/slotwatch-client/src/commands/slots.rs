//! One-off listing of currently bookable slots.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use slotwatch_booking::BoxFuture;
use slotwatch_core::{NameResolver, format_slot_line};
use slotwatch_server::{
    MemorySeenStore, NotificationSink, ServerResult, SlotDiscovery, install_signal_handler,
};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Sink for read-only walks; nobody is subscribed.
struct NoSubscribers;

impl NotificationSink for NoSubscribers {
    fn list_subscribers(&self) -> BoxFuture<'_, ServerResult<Vec<i64>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn send<'a>(&'a self, _subscriber: i64, _text: &'a str) -> BoxFuture<'a, ServerResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Print every bookable slot, grouped by service.
pub async fn slots(config: &ClientConfig) -> ClientResult<()> {
    let client = Arc::new(super::booking_client(config)?);
    let names = Arc::new(config.names());
    let discovery = SlotDiscovery::new(
        config.discovery_config(),
        client,
        Arc::new(MemorySeenStore::new()),
        Arc::new(NoSubscribers),
        names.clone(),
    );

    let cancel: CancellationToken = install_signal_handler();
    let found = discovery.current_slots(&cancel).await;
    cancel.cancel();

    if found.is_empty() {
        println!("Нет доступных слотов.");
        return Ok(());
    }

    let mut current_service = None;
    for slot in &found {
        if current_service != Some(slot.service_id) {
            current_service = Some(slot.service_id);
            let service = names
                .service_name(slot.service_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", slot.service_id));
            println!("{}:", service);
        }
        match format_slot_line(discovery.zone(), slot.staff_id, &slot.time) {
            Some(line) => println!("{}", line),
            None => println!(
                "📅 {} - Сотрудник #{}",
                slot.time.canonical(),
                slot.staff_id
            ),
        }
    }
    Ok(())
}
