use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One haul trip. At most one row per (driver_id, date) may have
/// `end_time = NULL`; that row is the driver's active trip for the day.
///
/// Wall-clock times are stored as "H:MM AM/PM" strings, distance in km,
/// duration as "Xh YYm", cost as a formatted peso string. A trip is closed
/// exactly once and never deleted by normal flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub date: NaiveDate,
    pub driver_id: Uuid,
    pub driver_name: Option<String>,
    pub truck_id: Option<Uuid>,
    pub truck_number: Option<String>,
    pub receipt_number: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub distance: f64,
    pub duration: String,
    pub cost: String,
}

/// Fields frozen onto a trip when it closes. The close is a conditional
/// update on `end_time IS NULL`, so a trip can only ever be closed once.
#[derive(Debug, Clone)]
pub struct TripClose {
    pub end_time: String,
    pub distance: f64,
    pub duration: String,
    pub cost: String,
}

impl Trip {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Complete trips carry a truck number, driver name, and receipt number.
    /// Incomplete trips are excluded from billing and compliance aggregates.
    pub fn is_complete(&self) -> bool {
        fn present(field: &Option<String>) -> bool {
            field.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        present(&self.truck_number) && present(&self.driver_name) && present(&self.receipt_number)
    }
}
