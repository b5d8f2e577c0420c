pub const SELECT_ACTIVE_TRIP: &str = r#"
SELECT id, date, driver_id, driver_name, truck_id, truck_number, receipt_number,
       start_time, end_time, distance, duration, cost
FROM trips
WHERE driver_id = $1 AND date = $2 AND end_time IS NULL
LIMIT 1;
"#;

pub const COUNT_TRUCK_TRIPS_FOR_DATE: &str = r#"
SELECT COUNT(*) FROM trips WHERE truck_id = $1 AND date = $2;
"#;

/// Claims the driver's active-trip slot for the day. The NOT EXISTS guard
/// makes start idempotent under double-invocation: the second insert affects
/// zero rows instead of creating a second active trip.
pub const INSERT_TRIP_IF_IDLE: &str = r#"
INSERT INTO trips (id, date, driver_id, driver_name, truck_id, truck_number,
                   receipt_number, start_time, end_time, distance, duration, cost)
SELECT $1, $2, $3, $4, $5, $6, $7, $8, NULL, $9, $10, $11
WHERE NOT EXISTS (
    SELECT 1 FROM trips WHERE driver_id = $3 AND date = $2 AND end_time IS NULL
)
RETURNING id, date, driver_id, driver_name, truck_id, truck_number, receipt_number,
          start_time, end_time, distance, duration, cost;
"#;

/// Closes a trip only while it is still open; the conditional update replaces
/// the old fetch-then-branch step, so a racing second completion affects zero
/// rows.
pub const CLOSE_ACTIVE_TRIP: &str = r#"
UPDATE trips
SET end_time = $2,
    distance = $3,
    duration = $4,
    cost = $5
WHERE id = $1 AND end_time IS NULL
RETURNING id, date, driver_id, driver_name, truck_id, truck_number, receipt_number,
          start_time, end_time, distance, duration, cost;
"#;

pub const SELECT_TRIPS_BETWEEN: &str = r#"
SELECT id, date, driver_id, driver_name, truck_id, truck_number, receipt_number,
       start_time, end_time, distance, duration, cost
FROM trips
WHERE date >= $1 AND date <= $2
ORDER BY date, start_time;
"#;

pub const SELECT_TRIP_PINGS: &str = r#"
SELECT driver_id, trip_id, latitude, longitude, accuracy, speed, heading, timestamp
FROM driver_locations
WHERE trip_id = $1
ORDER BY timestamp;
"#;

pub const INSERT_PING: &str = r#"
INSERT INTO driver_locations (driver_id, trip_id, latitude, longitude, accuracy, speed, heading, timestamp)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
"#;

pub const INSERT_PAYROLL_RECORD: &str = r#"
INSERT INTO payroll_records (id, driver_id, truck_id, date, trip_count, price_per_unit,
                             volume, unit_type, total_cost, site_id)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
"#;

pub const INSERT_BILLING_RECORD: &str = r#"
INSERT INTO billing_records (id, site_id, driver_id, date, amount, reference)
VALUES ($1, $2, $3, $4, $5, $6);
"#;

pub const INSERT_COMPLIANCE_CHECK: &str = r#"
INSERT INTO compliance_checks (id, site, truck_id, truck_number, last_check, status, notes)
VALUES ($1, $2, $3, $4, $5, $6, $7);
"#;

pub const SELECT_COMPLIANCE_CHECKS: &str = r#"
SELECT id, site, truck_id, truck_number, last_check, status, notes
FROM compliance_checks
ORDER BY last_check DESC;
"#;
