//! Poller: slot discovery, seen-slot store, notifications, scheduler.
//!
//! This crate provides the long-running side of slotwatch:
//! - Slot discovery ticks over the configured search space
//! - The seen-slot store used to decide what is new
//! - Notification fan-out to subscribers (Telegram)
//! - A fixed-interval scheduler with cancellation
//!
//! # Example
//!
//! ```rust,ignore
//! use slotwatch_server::{Scheduler, SchedulerConfig, SlotDiscovery, install_signal_handler};
//!
//! let discovery = Arc::new(SlotDiscovery::new(config, api, store, sink, names));
//! let cancel = install_signal_handler();
//! Scheduler::new(SchedulerConfig::new(interval))
//!     .run(cancel, move |token| {
//!         let discovery = discovery.clone();
//!         async move { discovery.run_tick(&token).await }
//!     })
//!     .await;
//! ```

mod config;
mod discovery;
mod error;
mod instance;
mod notify;
mod scheduler;
mod signals;
mod store;
mod subscribers;
pub mod telemetry;

pub use config::{
    DEFAULT_INTERVAL, DEFAULT_LOCATION_ID, DEFAULT_RETENTION, DEFAULT_TIMEZONE, DiscoveryConfig,
};
pub use discovery::{FoundSlot, SkipReason, SlotDiscovery, TickReport};
pub use error::{ServerError, ServerResult};
pub use instance::InstanceLock;
pub use notify::{
    BroadcastReport, NotificationSink, TELEGRAM_API_BASE, TelegramConfig, TelegramSink, broadcast,
};
pub use scheduler::{
    Scheduler, SchedulerConfig, SchedulerHandle, SchedulerState, SharedSchedulerState,
};
pub use signals::{install_signal_handler, spawn_signal_listener};
pub use store::{MemorySeenStore, SeenSlots, SqliteSeenStore};
pub use subscribers::{Subscriber, SubscriberStore};
