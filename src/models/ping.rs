use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One GPS sample from the tracking client. Immutable once written; ordered by
/// timestamp per driver. Recorded only while the driver has an active trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LocationPing {
    pub driver_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationPing {
    pub fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}
