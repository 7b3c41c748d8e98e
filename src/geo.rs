// SPDX-License-Identifier: MIT

//! Pure great-circle distance and geofence containment.
//!
//! All distance math runs in kilometers internally (haversine, Earth radius
//! 6371 km) and is exposed in meters where callers need it. Deterministic,
//! no failure modes; callers supply finite coordinates in valid ranges.

/// Earth radius used by the haversine formula, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(a: Coord, b: Coord) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two coordinates in meters.
pub fn distance_meters(a: Coord, b: Coord) -> f64 {
    haversine_km(a, b) * 1000.0
}

/// Whether `user` lies within `radius_m` meters of `target`.
/// The boundary is inclusive: distance == radius counts as inside.
pub fn is_within_geofence(user: Coord, target: Coord, radius_m: f64) -> bool {
    distance_meters(user, target) <= radius_m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coord::new(37.7749, -122.4194);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coord::new(37.7749, -122.4194);
        let b = Coord::new(37.3382, -121.8863);
        let ab = distance_meters(a, b);
        let ba = distance_meters(b, a);
        assert!((ab - ba).abs() < 1e-9, "{} != {}", ab, ba);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree of latitude is ~111.19 km with R = 6371 km.
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(1.0, 0.0);
        let km = haversine_km(a, b);
        assert!((km - 111.19).abs() < 0.05, "got {} km", km);
    }

    #[test]
    fn test_geofence_boundary_is_inclusive() {
        let target = Coord::new(12.9716, 77.5946);
        let user = Coord::new(12.9726, 77.5946);
        let d = distance_meters(user, target);

        assert!(is_within_geofence(user, target, d));
        assert!(is_within_geofence(user, target, d + 0.001));
        assert!(!is_within_geofence(user, target, d - 0.001));
    }

    #[test]
    fn test_geofence_150m_default() {
        let target = Coord::new(12.9716, 77.5946);
        // ~111 m north of the target
        let near = Coord::new(12.9726, 77.5946);
        // ~1.1 km north of the target
        let far = Coord::new(12.9816, 77.5946);

        assert!(is_within_geofence(near, target, 150.0));
        assert!(!is_within_geofence(far, target, 150.0));
    }
}
