//! Spherical-earth navigation math.
//!
//! Coordinates are decimal degrees, bearings are degrees clockwise from true
//! north in `[0, 360)`, distances are meters.

use crate::location::{GeoPoint, Locatable};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Linear planar scale, 0.001 degrees per 100 meters. Only approximately valid
/// for small extents, no latitude correction.
pub const DEGREES_PER_METER: f64 = 0.00001;

/// Great-circle distance between two points in meters, haversine formula.
///
/// Symmetric, and zero when `a == b`.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Initial bearing from `a` toward `b`, degrees clockwise from true north in `[0, 360)`.
///
/// Not symmetric, `bearing(a, b)` and `bearing(b, a)` generally differ by
/// roughly 180 degrees.
pub fn bearing_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Where a target bearing sits relative to the device heading, in `[0, 360)`.
/// 0 means dead ahead.
pub fn relative_bearing(target_bearing: f64, heading: f64) -> f64 {
    ((target_bearing - heading) % 360.0 + 360.0) % 360.0
}

/// The candidate closest to `origin` by great-circle distance.
///
/// Linear scan in slice order, ties keep the first candidate encountered.
/// Returns [None] when `candidates` is empty.
pub fn nearest<T: Locatable>(origin: GeoPoint, candidates: &[T]) -> Option<&T> {
    let mut best: Option<(&T, f64)> = None;

    for candidate in candidates {
        let dist = distance_meters(origin, candidate.geo_point());
        let closer = best.as_ref().is_none_or(|(_, best_dist)| dist < *best_dist);
        if closer {
            best = Some((candidate, dist));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Shift a point by a planar offset in meters, east and north positive.
/// Uses the same linear scale as the course importer, so only suitable for
/// small offsets.
pub fn offset_by_meters(point: GeoPoint, east_meters: f64, north_meters: f64) -> GeoPoint {
    GeoPoint::new(
        point.latitude + north_meters * DEGREES_PER_METER,
        point.longitude + east_meters * DEGREES_PER_METER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bristol() -> GeoPoint {
        GeoPoint::new(51.45, -2.59)
    }

    #[test]
    fn test_distance_same_point() {
        let p = bristol();
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = bristol();
        let b = GeoPoint::new(51.5074, -0.1278);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_due_north() {
        let a = bristol();
        let b = GeoPoint::new(51.46, -2.59);
        let dist = distance_meters(a, b);
        assert!((dist - 1112.0).abs() < 5.0, "distance was {dist}");
    }

    #[test]
    fn test_bearing_due_north() {
        let a = bristol();
        let b = GeoPoint::new(51.46, -2.59);
        let bearing = bearing_degrees(a, b);
        assert!(bearing < 0.5 || bearing > 359.5, "bearing was {bearing}");
    }

    #[test]
    fn test_bearing_in_range() {
        let points = [
            bristol(),
            GeoPoint::new(-33.86, 151.21),
            GeoPoint::new(35.68, 139.69),
            GeoPoint::new(40.71, -74.0),
        ];
        for a in points {
            for b in points {
                let bearing = bearing_degrees(a, b);
                assert!(
                    (0.0..360.0).contains(&bearing),
                    "bearing {bearing} out of range for {a:?} -> {b:?}"
                );
            }
        }
    }

    #[test]
    fn test_bearing_not_symmetric() {
        let a = bristol();
        let b = GeoPoint::new(51.46, -2.58);
        let fwd = bearing_degrees(a, b);
        let back = bearing_degrees(b, a);
        assert!((fwd - back).abs() > 1.0);
    }

    #[test]
    fn test_relative_bearing_wraps() {
        assert_eq!(relative_bearing(10.0, 350.0), 20.0);
        assert_eq!(relative_bearing(350.0, 10.0), 340.0);
        assert_eq!(relative_bearing(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_nearest_single_candidate() {
        let origin = bristol();
        let only = GeoPoint::new(51.46, -2.59);
        assert_eq!(nearest(origin, &[only]), Some(&only));
    }

    #[test]
    fn test_nearest_empty() {
        let origin = bristol();
        assert_eq!(nearest::<GeoPoint>(origin, &[]), None);
    }

    struct Named {
        name: &'static str,
        point: GeoPoint,
    }

    impl Locatable for Named {
        fn geo_point(&self) -> GeoPoint {
            self.point
        }
    }

    #[test]
    fn test_nearest_first_wins_ties() {
        let origin = bristol();
        let east = GeoPoint::new(51.45, -2.58);
        let candidates = [
            Named {
                name: "first",
                point: east,
            },
            Named {
                name: "second",
                point: east,
            },
        ];
        assert_eq!(nearest(origin, &candidates).unwrap().name, "first");
    }

    #[test]
    fn test_nearest_scans_all() {
        let origin = bristol();
        let candidates = [
            GeoPoint::new(52.0, -2.59),
            GeoPoint::new(51.451, -2.59),
            GeoPoint::new(51.5, -2.59),
        ];
        assert_eq!(nearest(origin, &candidates), Some(&candidates[1]));
    }

    #[test]
    fn test_offset_round_trip() {
        let origin = bristol();
        let moved = offset_by_meters(origin, 0.0, 100.0);
        let dist = distance_meters(origin, moved);
        // The linear scale overshoots latitude by roughly 11%
        assert!((90.0..125.0).contains(&dist), "distance was {dist}");
    }
}
