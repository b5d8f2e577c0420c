//! Ingest loop body: one NDJSON client event at a time.
//!
//! Position samples become queued GPS pings, but only while the driver holds
//! an active trip (the watch is conceptually stopped otherwise, so samples
//! without a trip are dropped). Trip-button presses go straight to the
//! lifecycle manager; if the store is unreachable the press is queued for
//! replay instead of being lost.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::event::{ClientEvent, PositionSample, TripButton};
use crate::models::ping::LocationPing;
use crate::models::sync::{SyncPayload, TripAction};
use crate::processor::trip_lifecycle::{TripLifecycle, TripOutcome};
use crate::queue::{OfflineQueue, QueueStorage};
use crate::store::TripStore;
use crate::tasks::FlushScheduler;
use crate::timefmt;

pub struct EventProcessor<S: TripStore, Q: QueueStorage> {
    store: Arc<S>,
    queue: Arc<OfflineQueue<Q>>,
    lifecycle: TripLifecycle,
    flush: Arc<FlushScheduler>,
    /// Samples older than this at receipt are discarded.
    geo_max_age: Duration,
    /// Gap between a driver's samples that indicates the watch lost its fix.
    geo_timeout: Duration,
    /// Last sample time per driver; the entry is dropped when the driver's
    /// trip closes so the next trip starts with a fresh clock.
    last_position_at: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl<S: TripStore, Q: QueueStorage> EventProcessor<S, Q> {
    pub fn new(
        store: Arc<S>,
        queue: Arc<OfflineQueue<Q>>,
        lifecycle: TripLifecycle,
        flush: Arc<FlushScheduler>,
        geo_max_age: Duration,
        geo_timeout: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            lifecycle,
            flush,
            geo_max_age,
            geo_timeout,
            last_position_at: Mutex::new(HashMap::new()),
        }
    }

    /// Parse and handle one NDJSON line. Malformed lines are logged and
    /// skipped; the ingest loop never stops for bad input.
    pub async fn process_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<ClientEvent>(line) {
            Ok(event) => self.process_event(event, Local::now()).await,
            Err(e) => warn!(error = %e, "failed to parse client event"),
        }
    }

    pub async fn process_event(&self, event: ClientEvent, now: DateTime<Local>) {
        match event {
            ClientEvent::Position(sample) => self.handle_position(sample, now).await,
            ClientEvent::TripButton(button) => self.handle_trip_button(button, now).await,
            ClientEvent::Online => {
                info!("client back online, triggering flush");
                self.flush.trigger_now();
            }
        }
    }

    async fn handle_position(&self, sample: PositionSample, now: DateTime<Local>) {
        let now_utc = now.with_timezone(&Utc);
        let timestamp = sample.timestamp.unwrap_or(now_utc);
        if now_utc - timestamp > self.geo_max_age {
            debug!(driver_id = %sample.driver_id, "discarding stale position sample");
            return;
        }

        let active = match self
            .store
            .find_active_trip(sample.driver_id, now.date_naive())
            .await
        {
            Ok(active) => active,
            Err(e) => {
                warn!(driver_id = %sample.driver_id, error = %e, "active-trip lookup failed, dropping sample");
                return;
            }
        };
        let Some(trip) = active else {
            debug!(driver_id = %sample.driver_id, "no active trip, ignoring position sample");
            return;
        };

        {
            let mut last = self.last_position_at.lock().expect("position clock poisoned");
            if let Some(prev) = last.get(&sample.driver_id) {
                if timestamp - *prev > self.geo_timeout {
                    warn!(
                        driver_id = %sample.driver_id,
                        gap_secs = (timestamp - *prev).num_seconds(),
                        "position gap exceeded acquisition timeout during active trip"
                    );
                }
            }
            last.insert(sample.driver_id, timestamp);
        }

        let ping = LocationPing {
            driver_id: sample.driver_id,
            trip_id: Some(trip.id),
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy.unwrap_or(0.0),
            speed: sample.speed,
            heading: sample.heading,
            timestamp,
        };
        if let Err(e) = self.queue.enqueue(SyncPayload::Gps(vec![ping])).await {
            warn!(error = %e, "failed to queue gps ping");
        }
    }

    async fn handle_trip_button(&self, button: TripButton, now: DateTime<Local>) {
        let action = TripAction {
            driver_id: button.driver_id,
            driver_name: button.driver_name,
            truck_id: button.truck_id,
            truck_number: button.truck_number,
            date: now.date_naive(),
            clock: timefmt::clock_from_time(now.time()),
        };

        match self.lifecycle.handle(self.store.as_ref(), &action).await {
            Ok(TripOutcome::Started(trip)) => {
                info!(trip_id = %trip.id, receipt = trip.receipt_number.as_deref().unwrap_or(""), "trip started");
            }
            Ok(TripOutcome::Completed(trip)) => {
                self.last_position_at
                    .lock()
                    .expect("position clock poisoned")
                    .remove(&action.driver_id);
                info!(trip_id = %trip.id, distance_km = trip.distance, cost = %trip.cost, "trip completed");
            }
            Err(e) if e.is_validation() => {
                // Blocking, user-visible; never retried.
                error!(driver_id = %action.driver_id, "{e}");
            }
            Err(e) => {
                warn!(driver_id = %action.driver_id, error = %e, "store unreachable, queueing trip action");
                if let Err(qe) = self.queue.enqueue(SyncPayload::Trip(action)).await {
                    error!(error = %qe, "failed to queue trip action");
                }
                self.flush.trigger_now();
            }
        }
    }
}
