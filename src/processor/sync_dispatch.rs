//! Typed sync dispatch: one handler per payload variant.
//!
//! The wire shape is `{"type": gps|trip|payroll|billing|compliance, "data": ...}`;
//! deserialization into [`SyncPayload`] already validated the payload shape.
//! Each arm applies the payload to the store, filling entry-form defaults the
//! client may have left blank.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::models::compliance::ComplianceStatus;
use crate::models::record::PayrollRecord;
use crate::models::sync::{SyncAck, SyncPayload};
use crate::payroll::{self, PayrollBasis, PayrollCalculator};
use crate::processor::trip_lifecycle::TripLifecycle;
use crate::queue::SyncTransport;
use crate::store::TripStore;

pub async fn apply<S: TripStore + ?Sized>(
    store: &S,
    lifecycle: &TripLifecycle,
    payload: &SyncPayload,
) -> Result<SyncAck> {
    match payload {
        SyncPayload::Gps(pings) => {
            let count = store.insert_pings(pings).await?;
            Ok(SyncAck { count })
        }
        SyncPayload::Trip(action) => match lifecycle.handle(store, action).await {
            Ok(_) => Ok(SyncAck { count: 1 }),
            // A replayed action that fails validation (no truck assigned, or
            // the trip was closed by a duplicate send) can never succeed on
            // retry; drop it rather than wedge the queue.
            Err(e) if e.is_validation() => {
                warn!(driver_id = %action.driver_id, error = %e, "dropping unreplayable trip action");
                Ok(SyncAck { count: 0 })
            }
            Err(e) => Err(e),
        },
        SyncPayload::Payroll(record) => {
            let record = normalized_payroll(record, lifecycle.calculator());
            store.insert_payroll(&record).await?;
            Ok(SyncAck { count: 1 })
        }
        SyncPayload::Billing(record) => {
            store.insert_billing(record).await?;
            Ok(SyncAck { count: 1 })
        }
        SyncPayload::Compliance(check) => {
            // Every check over this path is driver-filed; it enters the
            // review queue no matter what status the client claims.
            let mut check = check.clone();
            let filed = check.last_check;
            check.set_status(ComplianceStatus::NeedsReview, filed);
            store.insert_compliance(&check).await?;
            Ok(SyncAck { count: 1 })
        }
    }
}

/// Fill the entry-form defaults: a blank volume falls back to the truck's net
/// hauling capacity, and a blank total is recomputed with the manual formula.
fn normalized_payroll(record: &PayrollRecord, calculator: &PayrollCalculator) -> PayrollRecord {
    let mut record = record.clone();
    if record.volume <= 0.0 {
        if let Some(capacity) = record.rated_capacity {
            record.volume = payroll::net_capacity(capacity);
        }
    }
    if record.total_cost <= 0.0 {
        record.total_cost = calculator.total(&PayrollBasis::Manual {
            trip_count: record.trip_count.max(0) as u32,
            price_per_unit: record.price_per_unit,
            volume: record.volume,
        });
    }
    record
}

/// The daemon-side sync endpoint: applies payloads straight to the store.
pub struct StoreTransport<S: TripStore> {
    store: Arc<S>,
    lifecycle: TripLifecycle,
}

impl<S: TripStore> StoreTransport<S> {
    pub fn new(store: Arc<S>, lifecycle: TripLifecycle) -> Self {
        Self { store, lifecycle }
    }
}

#[async_trait]
impl<S: TripStore> SyncTransport for StoreTransport<S> {
    async fn send(&self, payload: &SyncPayload) -> Result<SyncAck> {
        apply(self.store.as_ref(), &self.lifecycle, payload).await
    }
}
