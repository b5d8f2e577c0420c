//! Persistence port for the trip/sync core.
//!
//! The core only needs insert-and-return-row, conditional update, and filtered
//! selects, so it talks to this trait rather than to sqlx directly. Production
//! uses [`PgStore`]; tests substitute the in-memory implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

use crate::db::{queries, DbPool};
use crate::error::Result;
use crate::models::compliance::{ComplianceCheck, ComplianceStatus};
use crate::models::ping::LocationPing;
use crate::models::record::{BillingRecord, PayrollRecord};
use crate::models::trip::{Trip, TripClose};

#[async_trait]
pub trait TripStore: Send + Sync {
    async fn find_active_trip(&self, driver_id: Uuid, date: NaiveDate) -> Result<Option<Trip>>;

    /// Trips already recorded for this truck on this date, used for receipt
    /// sequencing.
    async fn truck_trip_count(&self, truck_id: Uuid, date: NaiveDate) -> Result<i64>;

    /// Inserts the trip only if the driver's active-trip slot for that date is
    /// free. Returns `None` when the slot is already taken.
    async fn insert_trip_if_idle(&self, trip: &Trip) -> Result<Option<Trip>>;

    /// Closes the trip only while it is still open. Returns `None` when it was
    /// already closed.
    async fn close_active_trip(&self, trip_id: Uuid, close: &TripClose) -> Result<Option<Trip>>;

    async fn trips_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Trip>>;

    /// Pings for one trip, ordered by timestamp.
    async fn pings_for_trip(&self, trip_id: Uuid) -> Result<Vec<LocationPing>>;

    async fn insert_pings(&self, pings: &[LocationPing]) -> Result<u64>;

    async fn insert_payroll(&self, record: &PayrollRecord) -> Result<()>;

    async fn insert_billing(&self, record: &BillingRecord) -> Result<()>;

    async fn insert_compliance(&self, check: &ComplianceCheck) -> Result<()>;

    /// All recorded compliance checks, newest first.
    async fn compliance_checks(&self) -> Result<Vec<ComplianceCheck>>;
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for PgStore {
    async fn find_active_trip(&self, driver_id: Uuid, date: NaiveDate) -> Result<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(queries::SELECT_ACTIVE_TRIP)
            .bind(driver_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    async fn truck_trip_count(&self, truck_id: Uuid, date: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(queries::COUNT_TRUCK_TRIPS_FOR_DATE)
            .bind(truck_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_trip_if_idle(&self, trip: &Trip) -> Result<Option<Trip>> {
        let inserted = sqlx::query_as::<_, Trip>(queries::INSERT_TRIP_IF_IDLE)
            .bind(trip.id)
            .bind(trip.date)
            .bind(trip.driver_id)
            .bind(&trip.driver_name)
            .bind(trip.truck_id)
            .bind(&trip.truck_number)
            .bind(&trip.receipt_number)
            .bind(&trip.start_time)
            .bind(trip.distance)
            .bind(&trip.duration)
            .bind(&trip.cost)
            .fetch_optional(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn close_active_trip(&self, trip_id: Uuid, close: &TripClose) -> Result<Option<Trip>> {
        let closed = sqlx::query_as::<_, Trip>(queries::CLOSE_ACTIVE_TRIP)
            .bind(trip_id)
            .bind(&close.end_time)
            .bind(close.distance)
            .bind(&close.duration)
            .bind(&close.cost)
            .fetch_optional(&self.pool)
            .await?;
        Ok(closed)
    }

    async fn trips_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(queries::SELECT_TRIPS_BETWEEN)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(trips)
    }

    async fn pings_for_trip(&self, trip_id: Uuid) -> Result<Vec<LocationPing>> {
        let pings = sqlx::query_as::<_, LocationPing>(queries::SELECT_TRIP_PINGS)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(pings)
    }

    async fn insert_pings(&self, pings: &[LocationPing]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for ping in pings {
            sqlx::query(queries::INSERT_PING)
                .bind(ping.driver_id)
                .bind(ping.trip_id)
                .bind(ping.latitude)
                .bind(ping.longitude)
                .bind(ping.accuracy)
                .bind(ping.speed)
                .bind(ping.heading)
                .bind(ping.timestamp)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(pings.len() as u64)
    }

    async fn insert_payroll(&self, record: &PayrollRecord) -> Result<()> {
        sqlx::query(queries::INSERT_PAYROLL_RECORD)
            .bind(record.id)
            .bind(record.driver_id)
            .bind(record.truck_id)
            .bind(record.date)
            .bind(record.trip_count)
            .bind(record.price_per_unit)
            .bind(record.volume)
            .bind(&record.unit_type)
            .bind(record.total_cost)
            .bind(record.site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_billing(&self, record: &BillingRecord) -> Result<()> {
        sqlx::query(queries::INSERT_BILLING_RECORD)
            .bind(record.id)
            .bind(record.site_id)
            .bind(record.driver_id)
            .bind(record.date)
            .bind(record.amount)
            .bind(&record.reference)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_compliance(&self, check: &ComplianceCheck) -> Result<()> {
        sqlx::query(queries::INSERT_COMPLIANCE_CHECK)
            .bind(check.id)
            .bind(&check.site)
            .bind(check.truck_id)
            .bind(&check.truck_number)
            .bind(check.last_check)
            .bind(check.status.as_str())
            .bind(&check.notes)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Mapped by hand: status is stored as text, so FromRow does not apply.
    async fn compliance_checks(&self) -> Result<Vec<ComplianceCheck>> {
        let rows = sqlx::query(queries::SELECT_COMPLIANCE_CHECKS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ComplianceCheck {
                id: row.get("id"),
                site: row.get("site"),
                truck_id: row.get("truck_id"),
                truck_number: row.get("truck_number"),
                last_check: row.get("last_check"),
                status: ComplianceStatus::parse(&row.get::<String, _>("status")),
                notes: row.get("notes"),
            })
            .collect())
    }
}
