//! Great-circle distance over recorded GPS points.
//!
//! Trip distance is a naive pairwise haversine sum over whatever points were
//! recorded, in timestamp order. No map-matching, no outlier rejection.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two lat/lon pairs, in kilometers.
///
/// Pure and symmetric. Out-of-range coordinates are not guarded against; they
/// produce a defined but meaningless result.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Total distance along an ordered path of (lat, lon) points, in kilometers.
///
/// Zero or one points yield 0.
pub fn path_distance_km(path: &[(f64, f64)]) -> f64 {
    path.windows(2)
        .map(|pair| haversine_km(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}
