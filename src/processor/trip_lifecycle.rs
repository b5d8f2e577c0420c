//! Trip lifecycle: one entry point per trip-button press.
//!
//! The driver has a single button; whether it starts or completes a trip
//! depends on whether the driver already holds the active-trip slot for the
//! day. Both paths go through conditional store statements, so a double press
//! cannot create a second active trip or close a trip twice.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::sync::TripAction;
use crate::models::trip::{Trip, TripClose};
use crate::payroll::PayrollCalculator;
use crate::store::TripStore;
use crate::{geo, timefmt};

#[derive(Debug, Clone)]
pub enum TripOutcome {
    Started(Trip),
    Completed(Trip),
}

#[derive(Debug, Clone)]
pub struct TripLifecycle {
    calculator: PayrollCalculator,
}

impl TripLifecycle {
    pub fn new(rate_per_km: f64) -> Self {
        Self {
            calculator: PayrollCalculator::new(rate_per_km),
        }
    }

    pub fn calculator(&self) -> &PayrollCalculator {
        &self.calculator
    }

    /// Resolve a trip-button press: complete the active trip if one exists,
    /// otherwise start a new one.
    pub async fn handle<S: TripStore + ?Sized>(
        &self,
        store: &S,
        action: &TripAction,
    ) -> Result<TripOutcome> {
        // Two attempts: if the start insert loses the active-slot race to a
        // concurrent press, the second pass resolves as a completion.
        for _ in 0..2 {
            if let Some(active) = store.find_active_trip(action.driver_id, action.date).await? {
                let trip = self.complete(store, active, action).await?;
                return Ok(TripOutcome::Completed(trip));
            }

            match self.start(store, action).await? {
                Some(trip) => return Ok(TripOutcome::Started(trip)),
                None => {
                    warn!(
                        driver_id = %action.driver_id,
                        "active-trip slot claimed concurrently, retrying as completion"
                    );
                }
            }
        }
        Err(Error::Validation(
            "trip state changed while handling the action; try again".to_string(),
        ))
    }

    /// Start a new trip. Returns `None` if the active slot was claimed between
    /// the lookup and the insert.
    async fn start<S: TripStore + ?Sized>(
        &self,
        store: &S,
        action: &TripAction,
    ) -> Result<Option<Trip>> {
        let (truck_id, truck_number) = match (action.truck_id, action.truck_number.as_deref()) {
            (Some(id), Some(number)) if !number.trim().is_empty() => (id, number),
            _ => {
                return Err(Error::Validation(
                    "no truck assigned; ask a dispatcher to assign one before starting a trip"
                        .to_string(),
                ))
            }
        };

        let prior = store.truck_trip_count(truck_id, action.date).await?;
        let receipt = receipt_number(truck_number, prior + 1);

        let trip = Trip {
            id: Uuid::new_v4(),
            date: action.date,
            driver_id: action.driver_id,
            driver_name: Some(action.driver_name.clone()),
            truck_id: Some(truck_id),
            truck_number: Some(truck_number.to_string()),
            receipt_number: Some(receipt),
            start_time: action.clock.clone(),
            end_time: None,
            distance: 0.0,
            duration: "0h 00m".to_string(),
            cost: "₱0".to_string(),
        };

        let inserted = store.insert_trip_if_idle(&trip).await?;
        if let Some(trip) = &inserted {
            info!(
                trip_id = %trip.id,
                driver_id = %trip.driver_id,
                receipt = trip.receipt_number.as_deref().unwrap_or(""),
                "started trip"
            );
        }
        Ok(inserted)
    }

    /// Close the active trip, freezing end time, distance, duration, and cost.
    async fn complete<S: TripStore + ?Sized>(
        &self,
        store: &S,
        active: Trip,
        action: &TripAction,
    ) -> Result<Trip> {
        // Coarse clocks can collapse start and end into the same minute; force
        // the stored end time one minute later so the pair stays ordered.
        let end_time = if action.clock == active.start_time {
            timefmt::bump_one_minute(&active.start_time)
        } else {
            action.clock.clone()
        };

        let pings = store.pings_for_trip(active.id).await?;
        let path: Vec<(f64, f64)> = pings.iter().map(|p| p.coords()).collect();
        let distance = geo::path_distance_km(&path);

        let minutes = timefmt::duration_minutes(&active.start_time, &end_time);
        let close = TripClose {
            end_time,
            distance,
            duration: timefmt::format_duration(minutes),
            cost: timefmt::format_peso(self.calculator.gps_total(distance)),
        };

        match store.close_active_trip(active.id, &close).await? {
            Some(trip) => {
                info!(
                    trip_id = %trip.id,
                    driver_id = %trip.driver_id,
                    distance_km = trip.distance,
                    "completed trip"
                );
                Ok(trip)
            }
            None => Err(Error::Validation("trip was already completed".to_string())),
        }
    }
}

/// Per-truck-per-day receipt: `RCP-{truck digits, 0-padded to 3}-{seq, 0-padded to 3}`.
fn receipt_number(truck_number: &str, sequence: i64) -> String {
    let digits: String = truck_number.chars().filter(char::is_ascii_digit).collect();
    format!("RCP-{:0>3}-{:03}", digits, sequence)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::models::ping::LocationPing;
    use crate::store::memory::MemoryStore;

    fn action(truck: Option<(Uuid, &str)>, clock: &str) -> TripAction {
        TripAction {
            driver_id: Uuid::new_v4(),
            driver_name: "R. Dizon".into(),
            truck_id: truck.map(|(id, _)| id),
            truck_number: truck.map(|(_, n)| n.to_string()),
            date: NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
            clock: clock.into(),
        }
    }

    fn lifecycle() -> TripLifecycle {
        TripLifecycle::new(50.0)
    }

    #[test]
    fn receipt_pads_truck_digits_and_sequence() {
        assert_eq!(receipt_number("T-007", 3), "RCP-007-003");
        assert_eq!(receipt_number("T-7", 1), "RCP-007-001");
        assert_eq!(receipt_number("1234", 12), "RCP-1234-012");
    }

    #[tokio::test]
    async fn start_without_truck_is_a_validation_error_and_writes_nothing() {
        let store = MemoryStore::new();
        let err = lifecycle()
            .handle(&store, &action(None, "6:15 AM"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.trips().is_empty());
    }

    #[tokio::test]
    async fn start_creates_an_active_trip_with_zeroed_figures() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let outcome = lifecycle()
            .handle(&store, &action(Some((truck, "T-007")), "6:15 AM"))
            .await
            .unwrap();

        let TripOutcome::Started(trip) = outcome else {
            panic!("expected a started trip");
        };
        assert!(trip.is_active());
        assert_eq!(trip.receipt_number.as_deref(), Some("RCP-007-001"));
        assert_eq!(trip.start_time, "6:15 AM");
        assert_eq!(trip.distance, 0.0);
        assert_eq!(trip.duration, "0h 00m");
        assert_eq!(trip.cost, "₱0");
    }

    #[tokio::test]
    async fn receipt_sequence_counts_prior_truck_trips_for_the_day() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();

        for n in 1..=2 {
            store.push_trip(Trip {
                id: Uuid::new_v4(),
                date,
                driver_id: Uuid::new_v4(),
                driver_name: Some("earlier shift".into()),
                truck_id: Some(truck),
                truck_number: Some("T-007".into()),
                receipt_number: Some(format!("RCP-007-{:03}", n)),
                start_time: "5:00 AM".into(),
                end_time: Some("5:30 AM".into()),
                distance: 3.0,
                duration: "0h 30m".into(),
                cost: "₱150".into(),
            });
        }

        let outcome = lifecycle()
            .handle(&store, &action(Some((truck, "T-007")), "6:15 AM"))
            .await
            .unwrap();
        let TripOutcome::Started(trip) = outcome else {
            panic!("expected a started trip");
        };
        assert_eq!(trip.receipt_number.as_deref(), Some("RCP-007-003"));
    }

    #[tokio::test]
    async fn second_press_completes_instead_of_starting_a_second_trip() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let mut press = action(Some((truck, "T-007")), "6:15 AM");
        let manager = lifecycle();

        let TripOutcome::Started(started) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a started trip");
        };

        press.clock = "7:45 AM".into();
        let TripOutcome::Completed(completed) = manager.handle(&store, &press).await.unwrap()
        else {
            panic!("expected a completed trip");
        };
        assert_eq!(completed.id, started.id);
        assert_eq!(completed.end_time.as_deref(), Some("7:45 AM"));
        assert_eq!(completed.duration, "1h 30m");

        let trips = store.trips();
        assert_eq!(trips.len(), 1);
        assert!(trips.iter().all(|t| !t.is_active()));
    }

    #[tokio::test]
    async fn completion_sums_ping_distance_and_prices_it() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let mut press = action(Some((truck, "T-007")), "6:15 AM");
        let manager = lifecycle();

        let TripOutcome::Started(started) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a started trip");
        };

        // Two pings roughly 11 km apart along a meridian.
        let base = Utc.with_ymd_and_hms(2026, 8, 29, 6, 20, 0).unwrap();
        for (i, lat) in [14.60, 14.70].into_iter().enumerate() {
            store.push_ping(LocationPing {
                driver_id: press.driver_id,
                trip_id: Some(started.id),
                latitude: lat,
                longitude: 121.0,
                accuracy: 5.0,
                speed: Some(8.0),
                heading: None,
                timestamp: base + chrono::Duration::minutes(i as i64 * 10),
            });
        }

        press.clock = "7:00 AM".into();
        let TripOutcome::Completed(trip) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a completed trip");
        };
        assert!(trip.distance > 10.0 && trip.distance < 12.0, "{}", trip.distance);
        assert_eq!(trip.duration, "0h 45m");
        // ~11.1 km at ₱50/km, formatted.
        assert!(trip.cost.starts_with("₱5"), "{}", trip.cost);
    }

    #[tokio::test]
    async fn completion_with_no_pings_is_zero_distance_and_zero_cost() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let mut press = action(Some((truck, "T-007")), "6:15 AM");
        let manager = lifecycle();
        manager.handle(&store, &press).await.unwrap();

        press.clock = "6:45 AM".into();
        let TripOutcome::Completed(trip) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.distance, 0.0);
        assert_eq!(trip.cost, "₱0");
    }

    #[tokio::test]
    async fn same_minute_completion_bumps_end_time() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let press = action(Some((truck, "T-007")), "10:00 AM");
        let manager = lifecycle();
        manager.handle(&store, &press).await.unwrap();

        let TripOutcome::Completed(trip) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.end_time.as_deref(), Some("10:01 AM"));
        assert_eq!(trip.duration, "0h 01m");
    }

    #[tokio::test]
    async fn same_minute_completion_rolls_over_noon_hour() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let press = action(Some((truck, "T-007")), "12:59 PM");
        let manager = lifecycle();
        manager.handle(&store, &press).await.unwrap();

        let TripOutcome::Completed(trip) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.end_time.as_deref(), Some("1:00 PM"));
    }

    #[tokio::test]
    async fn overnight_completion_wraps_duration() {
        let store = MemoryStore::new();
        let truck = Uuid::new_v4();
        let mut press = action(Some((truck, "T-007")), "11:30 PM");
        let manager = lifecycle();
        manager.handle(&store, &press).await.unwrap();

        press.clock = "12:15 AM".into();
        let TripOutcome::Completed(trip) = manager.handle(&store, &press).await.unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.duration, "0h 45m");
    }
}
