//! Slot identity.
//!
//! A slot is identified by `(service, staff, datetime)`. The datetime comes
//! from the provider either as a full RFC 3339 instant or, for some records,
//! only as a bare time of day. Both shapes are normalized to the same RFC 3339
//! rendering before keying so one real-world slot never yields two keys.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::time::SlotZone;

/// A timeslot as understood after parsing the provider's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTime {
    /// A fully-qualified instant.
    Instant(DateTime<FixedOffset>),
    /// A value we could not interpret; kept verbatim.
    Raw(String),
}

impl SlotTime {
    /// Parses a provider timeslot value listed under `date`.
    ///
    /// Bare times (`HH:MM` or `HH:MM:SS`) are combined with `date` and the
    /// offset `zone` has on that day. Full instants are moved into `zone`, so
    /// the same instant always renders the same way whatever offset the
    /// provider wrote.
    pub fn parse(raw: &str, date: NaiveDate, zone: &SlotZone) -> Self {
        let trimmed = raw.trim();
        if let Some(instant) = parse_rfc3339(trimmed, zone) {
            return Self::Instant(instant);
        }

        let time = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"));
        if let Ok(time) = time
            && let Some(dt) = zone.localize(date.and_time(time))
        {
            return Self::Instant(dt);
        }

        Self::Raw(raw.to_string())
    }

    /// Parses a value with no usable listing date.
    ///
    /// Only full instants are understood; a bare time stays [`SlotTime::Raw`].
    pub fn parse_undated(raw: &str, zone: &SlotZone) -> Self {
        match parse_rfc3339(raw.trim(), zone) {
            Some(instant) => Self::Instant(instant),
            None => Self::Raw(raw.to_string()),
        }
    }

    /// Returns the instant, if the value was understood.
    pub fn as_instant(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Instant(dt) => Some(dt),
            Self::Raw(_) => None,
        }
    }

    /// Canonical string used for keying.
    pub fn canonical(&self) -> String {
        match self {
            Self::Instant(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, false),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

fn parse_rfc3339(value: &str, zone: &SlotZone) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| zone.to_zone_offset(&dt))
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Deduplication key of a slot: `svc=<service>|staff=<staff>|dt=<datetime>`.
///
/// A pure function of its inputs, so keys stay stable across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(String);

impl SlotKey {
    /// Builds the key for a slot.
    pub fn new(service_id: u64, staff_id: u64, time: &SlotTime) -> Self {
        Self(format!(
            "svc={}|staff={}|dt={}",
            service_id,
            staff_id,
            time.canonical()
        ))
    }

    /// Wraps an already-rendered key (e.g. one read back from storage).
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SlotKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn moscow() -> SlotZone {
        SlotZone::resolve("Europe/Moscow")
    }

    #[test]
    fn key_shape() {
        let time = SlotTime::parse("2025-06-01T10:00:00+03:00", june_first(), &moscow());
        let key = SlotKey::new(100, 42, &time);
        assert_eq!(key.as_str(), "svc=100|staff=42|dt=2025-06-01T10:00:00+03:00");
    }

    #[test]
    fn key_is_deterministic() {
        let time = SlotTime::parse("2025-06-01T10:00:00+03:00", june_first(), &moscow());
        assert_eq!(SlotKey::new(1, 2, &time), SlotKey::new(1, 2, &time));
    }

    #[test]
    fn key_differs_per_field() {
        let zone = moscow();
        let a = SlotTime::parse("2025-06-01T10:00:00+03:00", june_first(), &zone);
        let b = SlotTime::parse("2025-06-01T11:00:00+03:00", june_first(), &zone);
        let base = SlotKey::new(1, 2, &a);
        assert_ne!(base, SlotKey::new(9, 2, &a));
        assert_ne!(base, SlotKey::new(1, 9, &a));
        assert_ne!(base, SlotKey::new(1, 2, &b));
        // service and staff are not interchangeable
        assert_ne!(SlotKey::new(1, 2, &a), SlotKey::new(2, 1, &a));
    }

    #[test]
    fn bare_time_and_full_datetime_share_a_key() {
        let zone = moscow();
        let full = SlotTime::parse("2025-06-01T10:00:00+03:00", june_first(), &zone);
        let bare = SlotTime::parse("10:00", june_first(), &zone);
        let bare_secs = SlotTime::parse("10:00:00", june_first(), &zone);
        assert_eq!(SlotKey::new(1, 2, &full), SlotKey::new(1, 2, &bare));
        assert_eq!(SlotKey::new(1, 2, &full), SlotKey::new(1, 2, &bare_secs));
    }

    #[test]
    fn fractional_seconds_are_dropped() {
        let time = SlotTime::parse("2025-06-01T10:00:00.000+03:00", june_first(), &moscow());
        assert_eq!(time.canonical(), "2025-06-01T10:00:00+03:00");
    }

    #[test]
    fn instants_are_rendered_in_the_zone() {
        let time = SlotTime::parse("2025-06-01T07:00:00Z", june_first(), &moscow());
        assert_eq!(time.canonical(), "2025-06-01T10:00:00+03:00");

        let time = SlotTime::parse("2025-06-01T07:00:00Z", june_first(), &SlotZone::fallback());
        assert_eq!(time.canonical(), "2025-06-01T10:00:00+03:00");
    }

    #[test]
    fn one_instant_in_different_offsets_shares_a_key() {
        let zone = moscow();
        let spellings = [
            "2025-06-01T10:00:00+03:00",
            "2025-06-01T07:00:00Z",
            "2025-06-01T07:00:00+00:00",
            "2025-06-01T12:00:00+05:00",
            "10:00",
        ];
        let expected = "svc=1|staff=2|dt=2025-06-01T10:00:00+03:00";
        for raw in spellings {
            let time = SlotTime::parse(raw, june_first(), &zone);
            assert_eq!(SlotKey::new(1, 2, &time).as_str(), expected, "input {}", raw);
        }
    }

    #[test]
    fn undated_values_only_accept_full_instants() {
        let zone = moscow();
        assert_eq!(
            SlotTime::parse_undated("2025-06-01T07:00:00Z", &zone).canonical(),
            "2025-06-01T10:00:00+03:00"
        );
        assert_eq!(
            SlotTime::parse_undated("10:00", &zone),
            SlotTime::Raw("10:00".to_string())
        );
    }

    #[test]
    fn unparseable_values_are_kept_verbatim() {
        let time = SlotTime::parse("soon", june_first(), &moscow());
        assert_eq!(time, SlotTime::Raw("soon".to_string()));
        assert!(time.as_instant().is_none());
        assert_eq!(SlotKey::new(1, 2, &time).as_str(), "svc=1|staff=2|dt=soon");
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let key = SlotKey::from_raw("svc=1|staff=2|dt=x");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"svc=1|staff=2|dt=x\"");
    }
}
