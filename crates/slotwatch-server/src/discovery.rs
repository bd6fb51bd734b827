//! Slot discovery: one tick walks services, staff, dates and timeslots,
//! and notifies subscribers about slots the store has not seen yet.
//!
//! Every step is fail-soft. An error on one service, staff member or date is
//! logged and the walk moves on; nothing here aborts the poller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use slotwatch_booking::{BookingApi, BookingError};
use slotwatch_core::{
    FAR_FUTURE_DATE, NameResolver, SlotKey, SlotRef, SlotTime, SlotZone, format_slot_message,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::notify::{NotificationSink, broadcast};
use crate::store::SeenSlots;
use crate::telemetry;

/// Why a tick did not search at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoServices,
    NoLocation,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoServices => f.write_str("no services configured"),
            Self::NoLocation => f.write_str("no location configured"),
        }
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub elapsed: Duration,
    /// Timeslots checked against the store.
    pub checks: usize,
    pub new_slots: usize,
    pub delivery_failures: usize,
    /// API, store and sink errors that were logged and skipped.
    pub errors: usize,
    pub pruned: usize,
    pub skipped: Option<SkipReason>,
    /// The tick stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// A bookable slot as found by [`SlotDiscovery::current_slots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundSlot {
    pub service_id: u64,
    pub staff_id: u64,
    pub time: SlotTime,
}

/// Runs `fut` unless `cancel` fires first.
async fn guarded<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

fn record_api_error(report: &mut TickReport, stage: &'static str, err: &BookingError) {
    report.errors += 1;
    telemetry::record_error(stage, err.code().as_str());
}

/// Parses a date as listed by the API. A bare time needs it to be keyed.
fn listed_date(service_id: u64, staff_id: u64, date: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(service_id, staff_id, %date, error = %e, "unparseable listed date, bare times kept raw");
            None
        }
    }
}

/// The discovery engine.
pub struct SlotDiscovery {
    api: Arc<dyn BookingApi>,
    store: Arc<dyn SeenSlots>,
    sink: Arc<dyn NotificationSink>,
    names: Arc<dyn NameResolver>,
    config: DiscoveryConfig,
    zone: SlotZone,
}

impl SlotDiscovery {
    /// Creates the engine. The time zone is resolved once, here.
    pub fn new(
        config: DiscoveryConfig,
        api: Arc<dyn BookingApi>,
        store: Arc<dyn SeenSlots>,
        sink: Arc<dyn NotificationSink>,
        names: Arc<dyn NameResolver>,
    ) -> Self {
        let zone = SlotZone::resolve(&config.timezone);
        Self {
            api,
            store,
            sink,
            names,
            config,
            zone,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Returns the resolved zone.
    pub fn zone(&self) -> &SlotZone {
        &self.zone
    }

    fn slot_time(&self, raw: &str, listed_on: Option<NaiveDate>) -> SlotTime {
        match listed_on {
            Some(date) => SlotTime::parse(raw, date, &self.zone),
            None => SlotTime::parse_undated(raw, &self.zone),
        }
    }

    fn skip_reason(&self) -> Option<SkipReason> {
        if self.config.service_ids.is_empty() {
            Some(SkipReason::NoServices)
        } else if self.config.location_id == 0 {
            Some(SkipReason::NoLocation)
        } else {
            None
        }
    }

    /// Runs one full sweep, then prunes the store.
    ///
    /// Cancellation is honored around every network call and store access;
    /// a cancelled tick returns the partial report.
    #[tracing::instrument(skip_all, fields(component = "discovery"))]
    pub async fn run_tick(&self, cancel: &CancellationToken) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        if let Some(reason) = self.skip_reason() {
            info!(%reason, "skipping tick");
            report.skipped = Some(reason);
            return report;
        }

        let location_id = self.config.location_id;
        let today = self.zone.today();
        let date_from = today.format("%Y-%m-%d").to_string();

        'sweep: for &service_id in &self.config.service_ids {
            let staff = match guarded(cancel, self.api.list_bookable_staff(location_id, service_id)).await {
                None => {
                    report.cancelled = true;
                    break 'sweep;
                }
                Some(Err(e)) => {
                    warn!(service_id, error = %e, "failed to list staff, skipping service");
                    record_api_error(&mut report, "staff", &e);
                    continue;
                }
                Some(Ok(staff)) => staff,
            };
            if staff.is_empty() {
                debug!(service_id, "no bookable staff");
                continue;
            }

            for staff_id in staff {
                let dates = match guarded(
                    cancel,
                    self.api.list_bookable_dates(
                        location_id,
                        service_id,
                        &date_from,
                        FAR_FUTURE_DATE,
                        Some(staff_id),
                    ),
                )
                .await
                {
                    None => {
                        report.cancelled = true;
                        break 'sweep;
                    }
                    Some(Err(e)) => {
                        warn!(service_id, staff_id, error = %e, "failed to list dates, skipping staff");
                        record_api_error(&mut report, "dates", &e);
                        continue;
                    }
                    Some(Ok(dates)) => dates,
                };

                for date in dates {
                    let slots = match guarded(
                        cancel,
                        self.api
                            .list_bookable_timeslots(location_id, service_id, &date, staff_id),
                    )
                    .await
                    {
                        None => {
                            report.cancelled = true;
                            break 'sweep;
                        }
                        Some(Err(e)) => {
                            warn!(service_id, staff_id, %date, error = %e, "failed to list timeslots, skipping date");
                            record_api_error(&mut report, "timeslots", &e);
                            continue;
                        }
                        Some(Ok(slots)) => slots,
                    };

                    let listed_on = listed_date(service_id, staff_id, &date);
                    for raw in slots {
                        report.checks += 1;
                        let time = self.slot_time(&raw, listed_on);
                        let slot = SlotRef {
                            location_id,
                            service_id,
                            staff_id,
                            time: &time,
                        };
                        if !self.check_slot(cancel, slot, &mut report).await {
                            report.cancelled = true;
                            break 'sweep;
                        }
                    }
                }
            }
        }

        if !report.cancelled {
            match guarded(cancel, self.store.prune(self.config.retention)).await {
                None => report.cancelled = true,
                Some(Ok(pruned)) => report.pruned = pruned,
                Some(Err(e)) => {
                    warn!(error = %e, "failed to prune seen slots");
                    report.errors += 1;
                    telemetry::record_error("prune", e.kind());
                }
            }
        }

        report.elapsed = started.elapsed();
        telemetry::record_tick(
            report.elapsed.as_secs_f64(),
            report.checks,
            report.new_slots,
        );
        info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            checks = report.checks,
            new_slots = report.new_slots,
            delivery_failures = report.delivery_failures,
            errors = report.errors,
            pruned = report.pruned,
            cancelled = report.cancelled,
            "tick finished"
        );
        report
    }

    /// Handles one timeslot. Returns false if cancelled.
    async fn check_slot(
        &self,
        cancel: &CancellationToken,
        slot: SlotRef<'_>,
        report: &mut TickReport,
    ) -> bool {
        let key = SlotKey::new(slot.service_id, slot.staff_id, slot.time);

        match guarded(cancel, self.store.seen(&key)).await {
            None => return false,
            Some(Ok(true)) => return true,
            Some(Ok(false)) => {}
            Some(Err(e)) => {
                warn!(%key, error = %e, "seen-slot lookup failed, skipping slot");
                report.errors += 1;
                telemetry::record_error("store", e.kind());
                return true;
            }
        }

        info!(%key, "new slot found");
        report.new_slots += 1;

        match guarded(cancel, self.store.mark_seen(&key)).await {
            None => return false,
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!(%key, error = %e, "failed to mark slot as seen, notifying anyway");
                report.errors += 1;
                telemetry::record_error("store", e.kind());
            }
        }

        let text = format_slot_message(self.names.as_ref(), &self.zone, slot);
        match guarded(cancel, broadcast(self.sink.as_ref(), &text)).await {
            None => return false,
            Some(Ok(outcome)) => report.delivery_failures += outcome.failed,
            Some(Err(e)) => {
                warn!(%key, error = %e, "failed to list subscribers");
                report.errors += 1;
                telemetry::record_error("sink", e.kind());
            }
        }
        true
    }

    /// Walks the search space without touching the store or the sink.
    ///
    /// Errors are logged and skipped the same way a tick skips them.
    pub async fn current_slots(&self, cancel: &CancellationToken) -> Vec<FoundSlot> {
        let mut found = Vec::new();
        if let Some(reason) = self.skip_reason() {
            info!(%reason, "nothing to search");
            return found;
        }

        let location_id = self.config.location_id;
        let today = self.zone.today();
        let date_from = today.format("%Y-%m-%d").to_string();

        for &service_id in &self.config.service_ids {
            let Some(staff) = guarded(cancel, self.api.list_bookable_staff(location_id, service_id))
                .await
            else {
                return found;
            };
            let staff = match staff {
                Ok(staff) => staff,
                Err(e) => {
                    warn!(service_id, error = %e, "failed to list staff");
                    continue;
                }
            };

            for staff_id in staff {
                let Some(dates) = guarded(
                    cancel,
                    self.api.list_bookable_dates(
                        location_id,
                        service_id,
                        &date_from,
                        FAR_FUTURE_DATE,
                        Some(staff_id),
                    ),
                )
                .await
                else {
                    return found;
                };
                let dates = match dates {
                    Ok(dates) => dates,
                    Err(e) => {
                        warn!(service_id, staff_id, error = %e, "failed to list dates");
                        continue;
                    }
                };

                for date in dates {
                    let Some(slots) = guarded(
                        cancel,
                        self.api
                            .list_bookable_timeslots(location_id, service_id, &date, staff_id),
                    )
                    .await
                    else {
                        return found;
                    };
                    let slots = match slots {
                        Ok(slots) => slots,
                        Err(e) => {
                            warn!(service_id, staff_id, %date, error = %e, "failed to list timeslots");
                            continue;
                        }
                    };

                    let listed_on = listed_date(service_id, staff_id, &date);
                    found.extend(slots.iter().map(|raw| FoundSlot {
                        service_id,
                        staff_id,
                        time: self.slot_time(raw, listed_on),
                    }));
                }
            }
        }
        found
    }
}
