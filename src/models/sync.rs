use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::compliance::ComplianceCheck;
use crate::models::ping::LocationPing;
use crate::models::record::{BillingRecord, PayrollRecord};

/// A buffered mutation, tagged by target. This is the wire shape of the sync
/// endpoint (`{"type": "...", "data": ...}`); each variant carries its own
/// validated payload and has a dedicated dispatch handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SyncPayload {
    /// GPS pings, sent in batches; order within a batch is the enqueue order.
    Gps(Vec<LocationPing>),
    /// A trip-button press recorded offline, replayed through the lifecycle
    /// manager at flush time so it resolves against current store state.
    Trip(TripAction),
    Payroll(PayrollRecord),
    Billing(BillingRecord),
    Compliance(ComplianceCheck),
}

impl SyncPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            SyncPayload::Gps(_) => "gps",
            SyncPayload::Trip(_) => "trip",
            SyncPayload::Payroll(_) => "payroll",
            SyncPayload::Billing(_) => "billing",
            SyncPayload::Compliance(_) => "compliance",
        }
    }
}

/// A driver's trip-button press, with the wall-clock date and time it
/// happened. Start vs. complete is not recorded here; the lifecycle manager
/// decides based on whether the driver holds the active-trip slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripAction {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub truck_id: Option<Uuid>,
    pub truck_number: Option<String>,
    pub date: NaiveDate,
    /// "H:MM AM/PM" at the moment the button was pressed.
    pub clock: String,
}

/// Acknowledgement from the sync endpoint: how many rows the payload touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAck {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Failed,
}

/// One entry in the offline mutation queue. Synced items are pruned rather
/// than kept in a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub payload: SyncPayload,
    pub queued_at: DateTime<Utc>,
    pub status: SyncStatus,
}

impl QueueItem {
    pub fn new(payload: SyncPayload, queued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            queued_at,
            status: SyncStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_wire_shape_is_type_plus_data() {
        let action = TripAction {
            driver_id: Uuid::new_v4(),
            driver_name: "R. Dizon".into(),
            truck_id: Some(Uuid::new_v4()),
            truck_number: Some("T-007".into()),
            date: NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
            clock: "6:15 AM".into(),
        };
        let json = serde_json::to_value(SyncPayload::Trip(action.clone())).unwrap();
        assert_eq!(json["type"], "trip");
        assert_eq!(json["data"]["clock"], "6:15 AM");

        let back: SyncPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, SyncPayload::Trip(action));
    }

    #[test]
    fn gps_payload_carries_an_array() {
        let json = serde_json::to_value(SyncPayload::Gps(vec![])).unwrap();
        assert_eq!(json["type"], "gps");
        assert!(json["data"].is_array());
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let raw = r#"{"type": "telemetry", "data": {}}"#;
        assert!(serde_json::from_str::<SyncPayload>(raw).is_err());
    }
}
