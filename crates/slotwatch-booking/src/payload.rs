//! Request bodies for the availability search endpoints.
//!
//! All three endpoints share the `{context: {location_id}, filter: {...}}`
//! envelope; only the filter differs.

use serde::Serialize;

/// Top-level search body.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPayload<F> {
    pub context: SearchContext,
    pub filter: F,
}

/// Which location (company) the search runs against.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchContext {
    pub location_id: u64,
}

/// One search record: an optional staff member plus the requested services.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRecord {
    /// Serialized as `null` when absent; the platform expects the field.
    pub staff_id: Option<u64>,
    pub attendance_service_items: Vec<ServiceItem>,
}

impl SearchRecord {
    /// A record requesting a single service.
    pub fn service(service_id: u64, staff_id: Option<u64>) -> Self {
        Self {
            staff_id,
            attendance_service_items: vec![ServiceItem::service(service_id)],
        }
    }
}

/// An attendance item. Only services are searched.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: u64,
}

impl ServiceItem {
    pub fn service(id: u64) -> Self {
        Self { kind: "service", id }
    }
}

/// Filter for `search-staff`.
#[derive(Debug, Clone, Serialize)]
pub struct StaffFilter {
    pub datetime: Option<String>,
    pub records: Vec<SearchRecord>,
}

/// Filter for `search-dates`.
#[derive(Debug, Clone, Serialize)]
pub struct DatesFilter {
    pub date_from: String,
    pub date_to: String,
    pub records: Vec<SearchRecord>,
}

/// Filter for `search-timeslots`.
#[derive(Debug, Clone, Serialize)]
pub struct TimeslotsFilter {
    pub date: String,
    pub records: Vec<SearchRecord>,
}

/// Body for listing staff bookable for a service.
pub fn search_staff(location_id: u64, service_id: u64) -> SearchPayload<StaffFilter> {
    SearchPayload {
        context: SearchContext { location_id },
        filter: StaffFilter {
            datetime: None,
            records: vec![SearchRecord::service(service_id, None)],
        },
    }
}

/// Body for listing bookable dates in `[date_from, date_to]`.
pub fn search_dates(
    location_id: u64,
    service_id: u64,
    date_from: &str,
    date_to: &str,
    staff_id: Option<u64>,
) -> SearchPayload<DatesFilter> {
    SearchPayload {
        context: SearchContext { location_id },
        filter: DatesFilter {
            date_from: date_from.to_string(),
            date_to: date_to.to_string(),
            records: vec![SearchRecord::service(service_id, staff_id)],
        },
    }
}

/// Body for listing bookable timeslots on one date.
pub fn search_timeslots(
    location_id: u64,
    service_id: u64,
    date: &str,
    staff_id: u64,
) -> SearchPayload<TimeslotsFilter> {
    SearchPayload {
        context: SearchContext { location_id },
        filter: TimeslotsFilter {
            date: date.to_string(),
            records: vec![SearchRecord::service(service_id, Some(staff_id))],
        },
    }
}
