use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One payroll entry, from manual admin entry or the GPS formula.
/// Immutable once saved except through explicit edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub truck_id: Uuid,
    pub date: NaiveDate,
    pub trip_count: i32,
    pub price_per_unit: f64,
    pub volume: f64,
    pub unit_type: String,
    pub total_cost: f64,
    pub site_id: Uuid,
    /// Rated capacity of the assigned truck, carried so the server can apply
    /// the net-capacity volume default when the entry left volume blank.
    /// Not persisted as a column.
    #[serde(default)]
    pub rated_capacity: Option<f64>,
}

/// One billing entry, the bulk record type accepted by the sync endpoint
/// alongside payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub driver_id: Uuid,
    pub date: NaiveDate,
    pub amount: f64,
    pub reference: String,
}
