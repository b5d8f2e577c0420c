//! Payroll/billing totals.
//!
//! Two interchangeable formulas, chosen by a flag at entry time. The calculator
//! returns plain numbers; currency formatting lives in [`crate::timefmt`].
//! Zero inputs yield a zero total. Negative inputs are not validated against,
//! matching the recorded behavior of the entry flow.

/// Default payroll volume is the truck's rated capacity less a fixed 5%.
pub const NET_CAPACITY_FACTOR: f64 = 0.95;

/// Billing basis for one payroll entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PayrollBasis {
    /// Manual entry: trip count times the site rate times hauled volume.
    Manual {
        trip_count: u32,
        price_per_unit: f64,
        volume: f64,
    },
    /// GPS entry: cumulative trip distance at the per-kilometer rate.
    Gps { distance_km: f64 },
}

#[derive(Debug, Clone)]
pub struct PayrollCalculator {
    pub rate_per_km: f64,
}

impl PayrollCalculator {
    pub fn new(rate_per_km: f64) -> Self {
        Self { rate_per_km }
    }

    pub fn manual_total(&self, trip_count: u32, price_per_unit: f64, volume: f64) -> f64 {
        trip_count as f64 * price_per_unit * volume
    }

    pub fn gps_total(&self, distance_km: f64) -> f64 {
        distance_km * self.rate_per_km
    }

    pub fn total(&self, basis: &PayrollBasis) -> f64 {
        match basis {
            PayrollBasis::Manual {
                trip_count,
                price_per_unit,
                volume,
            } => self.manual_total(*trip_count, *price_per_unit, *volume),
            PayrollBasis::Gps { distance_km } => self.gps_total(*distance_km),
        }
    }
}

/// Net hauling capacity used as the default manual-entry volume.
pub fn net_capacity(rated_capacity: f64) -> f64 {
    rated_capacity * NET_CAPACITY_FACTOR
}

/// Whether the GPS formula should be pre-selected for a driver.
///
/// Any recorded GPS distance flips the toggle on; the operator can still
/// override it back to manual.
pub fn prefers_gps(total_gps_distance_km: f64) -> bool {
    total_gps_distance_km > 0.0
}
