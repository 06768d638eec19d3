// src/nav/geo.rs
//! Geodesy seam: great-circle distance and initial bearing
//!
//! Route selection only needs `distance_and_bearing`; the formula behind it
//! is injected so tests and alternative models (projected grids, ellipsoids)
//! can swap it out.

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance/bearing provider between two WGS84 coordinates.
pub trait Geodesy {
    /// Returns (meters, initial bearing in degrees within [0, 360)).
    fn distance_and_bearing(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64);
}

/// Spherical haversine distance with forward-azimuth bearing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl Geodesy for Haversine {
    fn distance_and_bearing(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let dphi = (lat2 - lat1).to_radians();
        let dlambda = (lon2 - lon1).to_radians();

        let a = (dphi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        let distance = 2.0 * EARTH_RADIUS_M * a.sqrt().asin();

        let y = dlambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
        let bearing = wrap_360(y.atan2(x).to_degrees());

        (distance, bearing)
    }
}

/// Normalize an angle into [0, 360).
pub fn wrap_360(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Normalize an angle into (-180, 180].
pub fn wrap_180(angle: f64) -> f64 {
    let wrapped = wrap_360(angle);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_longitude_degree_at_equator() {
        let (dist, bearing) = Haversine.distance_and_bearing(0.0, 0.0, 0.0, 1.0);
        assert!((dist - 111_195.0).abs() < 100.0, "got {}", dist);
        assert!((bearing - 90.0).abs() < 0.1, "got {}", bearing);
    }

    #[test]
    fn due_north_is_zero_bearing() {
        let (_, bearing) = Haversine.distance_and_bearing(52.0, 13.0, 53.0, 13.0);
        assert!(bearing < 0.1 || bearing > 359.9, "got {}", bearing);
    }

    #[test]
    fn southwest_bearing_wraps_positive() {
        let (_, bearing) = Haversine.distance_and_bearing(52.0, 13.0, 51.9, 12.8);
        assert!((180.0..270.0).contains(&bearing), "got {}", bearing);
    }

    #[test]
    fn zero_distance_to_self() {
        let (dist, _) = Haversine.distance_and_bearing(48.1, 11.5, 48.1, 11.5);
        assert!(dist.abs() < 1e-6);
    }

    #[test]
    fn wrap_helpers() {
        assert_eq!(wrap_360(-90.0), 270.0);
        assert_eq!(wrap_360(370.0), 10.0);
        assert_eq!(wrap_180(270.0), -90.0);
        assert_eq!(wrap_180(180.0), 180.0);
        assert_eq!(wrap_180(-190.0), 170.0);
    }
}
