//! Notification text for discovered slots.

use crate::names::NameResolver;
use crate::slot::SlotTime;
use crate::time::SlotZone;

/// Identifies the slot a message is about.
#[derive(Debug, Clone, Copy)]
pub struct SlotRef<'a> {
    pub location_id: u64,
    pub service_id: u64,
    pub staff_id: u64,
    pub time: &'a SlotTime,
}

/// Renders the "new slot" notification sent to subscribers.
///
/// Names fall back to `#<id>`. When the time could not be parsed the raw value
/// is shown and the date line is left out.
pub fn format_slot_message(names: &dyn NameResolver, zone: &SlotZone, slot: SlotRef<'_>) -> String {
    let location = names
        .location_name(slot.location_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", slot.location_id));
    let service = names
        .service_name(slot.service_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", slot.service_id));

    let mut out = String::from("🟢 Доступно окно записи\n\n");
    out.push_str(&format!("Компания: {}\n", location));
    out.push_str(&format!("Услуга: {}\n", service));
    out.push_str(&format!("Сотрудник: #{}\n", slot.staff_id));

    match slot.time {
        SlotTime::Instant(dt) => {
            let zoned = zone.present(dt);
            out.push_str(&format!(
                "Дата: {} ({})\n",
                zoned.date_label(),
                zoned.weekday_label()
            ));
            out.push_str(&format!(
                "Время: {} {}\n",
                zoned.clock_label(),
                zoned.abbreviation
            ));
        }
        SlotTime::Raw(raw) => {
            tracing::debug!(datetime = %raw, "failed to parse datetime, using raw value");
            out.push_str(&format!("Время: {}\n", raw));
        }
    }

    out
}

/// One line of the current-slots listing, or `None` for unparsed times.
pub fn format_slot_line(zone: &SlotZone, staff_id: u64, time: &SlotTime) -> Option<String> {
    let zoned = zone.present(time.as_instant()?);
    Some(format!(
        "📅 {} ({}) в {} - Сотрудник #{}",
        zoned.date_label(),
        zoned.weekday_label(),
        zoned.clock_label(),
        staff_id
    ))
}
