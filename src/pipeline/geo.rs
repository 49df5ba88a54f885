//! Geographic helpers: great-circle distance and NYC boundaries

/// Manhattan center (Times Square), the reference point for all
/// distance-banded estimation in the pipeline.
pub const MANHATTAN_CENTER: (f64, f64) = (40.7580, -73.9855);

/// NYC bounding box used for coordinate validation.
pub const NYC_LAT_MIN: f64 = 40.4774;
pub const NYC_LAT_MAX: f64 = 40.9176;
pub const NYC_LNG_MIN: f64 = -74.2591;
pub const NYC_LNG_MAX: f64 = -73.7004;

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Great-circle distance between two coordinates in miles (Haversine).
pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MILES * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Miles from a point to the Manhattan center.
pub fn distance_to_manhattan(latitude: f64, longitude: f64) -> f64 {
    haversine_miles(
        latitude,
        longitude,
        MANHATTAN_CENTER.0,
        MANHATTAN_CENTER.1,
    )
}

/// Whether coordinates fall inside the NYC bounding box.
pub fn within_nyc_bounds(latitude: f64, longitude: f64) -> bool {
    (NYC_LAT_MIN..=NYC_LAT_MAX).contains(&latitude)
        && (NYC_LNG_MIN..=NYC_LNG_MAX).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_distance() {
        let d = haversine_miles(40.7580, -73.9855, 40.7580, -73.9855);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Times Square to Grand Army Plaza (Brooklyn), roughly 7 miles
        let d = haversine_miles(40.7580, -73.9855, 40.6743, -73.9702);
        assert!(d > 5.0 && d < 8.0, "unexpected distance: {d}");
    }

    #[test]
    fn test_nyc_bounds() {
        assert!(within_nyc_bounds(40.7580, -73.9855)); // Times Square
        assert!(within_nyc_bounds(40.6782, -73.9442)); // Brooklyn
        assert!(!within_nyc_bounds(42.3601, -71.0589)); // Boston
        assert!(!within_nyc_bounds(40.7580, -70.0)); // Atlantic Ocean
    }

    #[test]
    fn test_bounds_edges_inclusive() {
        assert!(within_nyc_bounds(NYC_LAT_MIN, NYC_LNG_MIN));
        assert!(within_nyc_bounds(NYC_LAT_MAX, NYC_LNG_MAX));
    }
}
