//! Read-side aggregation for the records and compliance views.
//!
//! Pure functions over already-fetched rows. Incomplete trips (missing any of
//! truck number, driver name, or receipt number) are excluded from verified
//! counts and billing aggregates.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::compliance::{ComplianceCheck, ComplianceStatus};
use crate::models::trip::Trip;
use crate::payroll::PayrollCalculator;

/// Trips eligible for billing and compliance reporting.
pub fn verified_trips(trips: &[Trip]) -> Vec<&Trip> {
    trips.iter().filter(|t| t.is_complete()).collect()
}

pub fn verified_trip_count(trips: &[Trip]) -> usize {
    verified_trips(trips).len()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverBillingSummary {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub trip_count: usize,
    pub total_distance_km: f64,
    pub total_due: f64,
    /// Whether the GPS formula auto-selects for this driver (any recorded
    /// distance flips it; the operator can still override).
    pub gps_preferred: bool,
}

/// Per-driver billing rollup priced by the GPS formula, complete trips only.
pub fn billing_by_driver(trips: &[Trip], calculator: &PayrollCalculator) -> Vec<DriverBillingSummary> {
    let mut by_driver: BTreeMap<Uuid, DriverBillingSummary> = BTreeMap::new();
    for trip in verified_trips(trips) {
        let entry = by_driver
            .entry(trip.driver_id)
            .or_insert_with(|| DriverBillingSummary {
                driver_id: trip.driver_id,
                driver_name: trip.driver_name.clone().unwrap_or_default(),
                trip_count: 0,
                total_distance_km: 0.0,
                total_due: 0.0,
                gps_preferred: false,
            });
        entry.trip_count += 1;
        entry.total_distance_km += trip.distance;
        entry.total_due += calculator.gps_total(trip.distance);
    }
    let mut summaries: Vec<DriverBillingSummary> = by_driver.into_values().collect();
    for summary in &mut summaries {
        summary.gps_preferred = crate::payroll::prefers_gps(summary.total_distance_km);
    }
    summaries
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceSummary {
    pub compliant: usize,
    pub needs_review: usize,
    pub non_compliant: usize,
}

pub fn compliance_summary(checks: &[ComplianceCheck]) -> ComplianceSummary {
    let mut summary = ComplianceSummary::default();
    for check in checks {
        match check.status {
            ComplianceStatus::Compliant => summary.compliant += 1,
            ComplianceStatus::NeedsReview => summary.needs_review += 1,
            ComplianceStatus::NonCompliant => summary.non_compliant += 1,
        }
    }
    summary
}
