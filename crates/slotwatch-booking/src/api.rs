//! The [`BookingApi`] trait: the seam between the discovery loop and the
//! remote booking platform.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BookingResult;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to bookable availability.
///
/// Implementations own authentication; callers only pass search coordinates.
/// Errors are returned as-is and never retried here.
pub trait BookingApi: Send + Sync {
    /// Staff members bookable for `service_id` at `location_id`.
    fn list_bookable_staff(
        &self,
        location_id: u64,
        service_id: u64,
    ) -> BoxFuture<'_, BookingResult<Vec<u64>>>;

    /// Bookable calendar days in `[date_from, date_to]`, as `YYYY-MM-DD`.
    ///
    /// An open-ended range uses the far-future sentinel `9999-01-01` as `date_to`.
    fn list_bookable_dates<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date_from: &'a str,
        date_to: &'a str,
        staff_id: Option<u64>,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>>;

    /// Bookable timeslots on `date`: RFC 3339 datetimes, or bare times when
    /// the platform omits the datetime.
    fn list_bookable_timeslots<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date: &'a str,
        staff_id: u64,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>>;
}

impl<T: BookingApi + ?Sized> BookingApi for Arc<T> {
    fn list_bookable_staff(
        &self,
        location_id: u64,
        service_id: u64,
    ) -> BoxFuture<'_, BookingResult<Vec<u64>>> {
        (**self).list_bookable_staff(location_id, service_id)
    }

    fn list_bookable_dates<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date_from: &'a str,
        date_to: &'a str,
        staff_id: Option<u64>,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>> {
        (**self).list_bookable_dates(location_id, service_id, date_from, date_to, staff_id)
    }

    fn list_bookable_timeslots<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date: &'a str,
        staff_id: u64,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>> {
        (**self).list_bookable_timeslots(location_id, service_id, date, staff_id)
    }
}
