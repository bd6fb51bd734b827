//! Core types: slot keys, zones, name tables, message formatting

pub mod format;
pub mod names;
pub mod slot;
pub mod time;
pub mod tracing;

pub use format::{SlotRef, format_slot_line, format_slot_message};
pub use names::{NameResolver, StaticNames};
pub use slot::{SlotKey, SlotTime};
pub use time::{FALLBACK_ZONE_NAME, FAR_FUTURE_DATE, SlotZone, ZonedTime, weekday_ru};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
