//! Response decoding for the availability endpoints.
//!
//! Every endpoint answers `{data: [{type, id, attributes: {...}}]}`. The
//! envelope is decoded first; each record is then decoded on its own so one
//! malformed record never fails the whole call.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{BookingError, BookingResult};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Value>,
}

/// One `{type, id, attributes}` record.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiObject<A> {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Identifiers arrive as strings, occasionally as numbers.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub attributes: A,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected id type: {}",
            other
        ))),
    }
}

/// Attributes of a `search-staff` record.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffAttributes {
    #[serde(default)]
    pub is_bookable: bool,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
}

/// Attributes of a `search-dates` record.
#[derive(Debug, Clone, Deserialize)]
pub struct DateAttributes {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub is_bookable: bool,
}

/// Attributes of a `search-timeslots` record.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeslotAttributes {
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub is_bookable: bool,
}

/// Decodes the envelope and every record that matches `A`.
///
/// Records that fail to decode are logged and skipped.
pub fn decode_records<A>(body: &[u8], what: &str) -> BookingResult<Vec<ApiObject<A>>>
where
    A: DeserializeOwned,
{
    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| {
        BookingError::invalid_response(format!("failed to parse {} response: {}", what, e))
            .with_source(e)
    })?;

    let mut records = Vec::with_capacity(envelope.data.len());
    for (index, raw) in envelope.data.into_iter().enumerate() {
        match serde_json::from_value::<ApiObject<A>>(raw) {
            Ok(record) => records.push(record),
            Err(e) => warn!(what, index, error = %e, "skipping malformed record"),
        }
    }
    Ok(records)
}

/// Bookable staff ids. Non-numeric ids are skipped.
pub fn parse_staff_ids(body: &[u8]) -> BookingResult<Vec<u64>> {
    let records = decode_records::<StaffAttributes>(body, "staff")?;
    Ok(records
        .into_iter()
        .filter(|r| r.attributes.is_bookable)
        .filter_map(|r| r.id.trim().parse().ok())
        .collect())
}

/// Bookable calendar days, as sent by the platform (`YYYY-MM-DD`).
pub fn parse_dates(body: &[u8]) -> BookingResult<Vec<String>> {
    let records = decode_records::<DateAttributes>(body, "dates")?;
    Ok(records
        .into_iter()
        .filter(|r| r.attributes.is_bookable)
        .filter_map(|r| r.attributes.date.filter(|d| !d.is_empty()))
        .collect())
}

/// Bookable timeslots: the full datetime when present, else the bare time.
pub fn parse_timeslots(body: &[u8]) -> BookingResult<Vec<String>> {
    let records = decode_records::<TimeslotAttributes>(body, "timeslots")?;
    Ok(records
        .into_iter()
        .filter(|r| r.attributes.is_bookable)
        .filter_map(|r| {
            let TimeslotAttributes { datetime, time, .. } = r.attributes;
            datetime
                .filter(|s| !s.is_empty())
                .or_else(|| time.filter(|s| !s.is_empty()))
        })
        .collect())
}
