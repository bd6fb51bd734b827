//! Time zone handling for slot discovery.
//!
//! The booking platform reports slots as RFC 3339 instants, but everything a
//! subscriber sees (and the "today" used as the lower bound of the date
//! search) is computed in a configured IANA zone. When that zone cannot be
//! resolved we fall back to a fixed UTC+3 offset and keep going.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use tracing::warn;

/// Offset used when the configured zone name is unknown.
pub const FALLBACK_OFFSET_SECS: i32 = 3 * 3600;

/// Display name of the fallback zone.
pub const FALLBACK_ZONE_NAME: &str = "UTC+3";

/// Upper bound of the date search, meaning "no known end".
pub const FAR_FUTURE_DATE: &str = "9999-01-01";

/// The zone slots are presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotZone {
    /// A zone from the IANA database.
    Named(Tz),
    /// A fixed offset (the fallback).
    Fixed(FixedOffset),
}

impl SlotZone {
    /// Resolves a zone name, logging and falling back to UTC+3 on failure.
    pub fn resolve(name: &str) -> Self {
        match Self::try_resolve(name) {
            Some(zone) => zone,
            None => {
                warn!(
                    timezone = %name,
                    fallback = FALLBACK_ZONE_NAME,
                    "failed to load timezone, using fallback"
                );
                Self::fallback()
            }
        }
    }

    /// Resolves a zone name without falling back.
    pub fn try_resolve(name: &str) -> Option<Self> {
        name.trim().parse::<Tz>().ok().map(Self::Named)
    }

    /// The fixed UTC+3 zone.
    pub fn fallback() -> Self {
        Self::Fixed(FixedOffset::east_opt(FALLBACK_OFFSET_SECS).expect("valid offset"))
    }

    /// Returns true if this is the fixed fallback zone.
    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// Today's calendar date in this zone.
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// The calendar date of `instant` in this zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
            Self::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// Attaches this zone's offset to a wall-clock time.
    ///
    /// Ambiguous local times (DST fold) resolve to the earlier instant; times
    /// that do not exist (DST gap) return `None`.
    pub fn localize(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Named(tz) => tz
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
            Self::Fixed(offset) => offset.from_local_datetime(&local).single(),
        }
    }

    /// The same instant, carrying the offset this zone has at that moment.
    pub fn to_zone_offset(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Self::Named(tz) => {
                let local = instant.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
            Self::Fixed(offset) => instant.with_timezone(offset),
        }
    }

    /// Converts an instant into this zone for display.
    pub fn present(&self, instant: &DateTime<FixedOffset>) -> ZonedTime {
        match self {
            Self::Named(tz) => {
                let local = instant.with_timezone(tz);
                ZonedTime {
                    local: local.naive_local(),
                    weekday: local.weekday(),
                    abbreviation: local.format("%Z").to_string(),
                }
            }
            Self::Fixed(offset) => {
                let local = instant.with_timezone(offset);
                ZonedTime {
                    local: local.naive_local(),
                    weekday: local.weekday(),
                    abbreviation: fixed_offset_name(offset),
                }
            }
        }
    }
}

impl fmt::Display for SlotZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => write!(f, "{}", tz.name()),
            Self::Fixed(offset) => write!(f, "{}", fixed_offset_name(offset)),
        }
    }
}

/// An instant broken down in a [`SlotZone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedTime {
    /// Wall-clock date and time.
    pub local: NaiveDateTime,
    /// Day of the week.
    pub weekday: Weekday,
    /// Zone abbreviation (e.g. `MSK`, `UTC+3`).
    pub abbreviation: String,
}

impl ZonedTime {
    /// `DD.MM.YYYY`
    pub fn date_label(&self) -> String {
        self.local.format("%d.%m.%Y").to_string()
    }

    /// 24-hour `HH:MM`.
    pub fn clock_label(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    /// Weekday name in Russian.
    pub fn weekday_label(&self) -> &'static str {
        weekday_ru(self.weekday)
    }
}

/// Lowercase Russian weekday name.
pub fn weekday_ru(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "понедельник",
        Weekday::Tue => "вторник",
        Weekday::Wed => "среда",
        Weekday::Thu => "четверг",
        Weekday::Fri => "пятница",
        Weekday::Sat => "суббота",
        Weekday::Sun => "воскресенье",
    }
}

fn fixed_offset_name(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let hours = secs.abs() / 3600;
    let minutes = (secs.abs() % 3600) / 60;
    if minutes == 0 {
        format!("UTC{}{}", sign, hours)
    } else {
        format!("UTC{}{}:{:02}", sign, hours, minutes)
    }
}
