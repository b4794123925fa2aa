//! # Geodetic / NED Conversions
//!
//! Ellipsoidal tangent-plane model: points are lifted to ECEF, the
//! difference to the reference is rotated into the reference's local frame.

use super::{Ecef, Geodetic, Ned, WGS84_A, WGS84_E2};

/// Iteration cap for [`ecef_to_geodetic`]; convergence normally takes 3-4 rounds
const MAX_LATITUDE_ITERATIONS: usize = 16;

/// Latitude convergence threshold in radians (about 0.6 µm on the ground)
const LATITUDE_TOLERANCE_RAD: f64 = 1e-13;

/// Prime vertical radius of curvature at the given latitude
fn prime_vertical_radius(sin_lat: f64) -> f64 {
    WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt()
}

/// Convert a geodetic point to ECEF
pub fn geodetic_to_ecef(point: &Geodetic) -> Ecef {
    let (sin_lat, cos_lat) = point.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.lon.to_radians().sin_cos();
    let n = prime_vertical_radius(sin_lat);

    Ecef {
        x: (n + point.alt) * cos_lat * cos_lon,
        y: (n + point.alt) * cos_lat * sin_lon,
        z: (n * (1.0 - WGS84_E2) + point.alt) * sin_lat,
    }
}

/// Convert ECEF coordinates to a geodetic point
///
/// Fixed-point iteration on latitude. The height formula avoids dividing by
/// `cos(lat)` so it stays well conditioned near the poles.
pub fn ecef_to_geodetic(ecef: &Ecef) -> Geodetic {
    let lon = ecef.y.atan2(ecef.x);
    let p = ecef.x.hypot(ecef.y);

    let mut lat = ecef.z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..MAX_LATITUDE_ITERATIONS {
        let sin_lat = lat.sin();
        let n = prime_vertical_radius(sin_lat);
        let next = (ecef.z + WGS84_E2 * n * sin_lat).atan2(p);
        let delta = (next - lat).abs();
        lat = next;
        if delta < LATITUDE_TOLERANCE_RAD {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = prime_vertical_radius(sin_lat);
    let alt = p * cos_lat + ecef.z * sin_lat - WGS84_A * WGS84_A / n;

    Geodetic {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
        alt,
    }
}

/// Express `point` as a NED offset from `reference`
pub fn geodetic_to_ned(point: &Geodetic, reference: &Geodetic) -> Ned {
    let p = geodetic_to_ecef(point);
    let r = geodetic_to_ecef(reference);
    let (dx, dy, dz) = (p.x - r.x, p.y - r.y, p.z - r.z);

    let (sin_lat, cos_lat) = reference.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = reference.lon.to_radians().sin_cos();

    let east = -sin_lon * dx + cos_lon * dy;
    let north = -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz;
    let up = cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz;

    Ned { north, east, down: -up }
}

/// Resolve a NED offset from `reference` to a geodetic point
pub fn ned_to_geodetic(offset: &Ned, reference: &Geodetic) -> Geodetic {
    let r = geodetic_to_ecef(reference);

    let (sin_lat, cos_lat) = reference.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = reference.lon.to_radians().sin_cos();
    let (n, e, u) = (offset.north, offset.east, -offset.down);

    let dx = -sin_lon * e - sin_lat * cos_lon * n + cos_lat * cos_lon * u;
    let dy = cos_lon * e - sin_lat * sin_lon * n + cos_lat * sin_lon * u;
    let dz = cos_lat * n + sin_lat * u;

    ecef_to_geodetic(&Ecef {
        x: r.x + dx,
        y: r.y + dy,
        z: r.z + dz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance;

    /// Metres per degree of latitude, roughly, at mid latitudes
    const METRES_PER_DEG_LAT: f64 = 111_000.0;

    fn assert_close(a: &Geodetic, b: &Geodetic, tol_m: f64) {
        let d = distance(a, b);
        assert!(d < tol_m, "{:?} and {:?} are {} m apart", a, b, d);
    }

    #[test]
    fn test_ecef_equator_prime_meridian() {
        let ecef = geodetic_to_ecef(&Geodetic::new(0.0, 0.0, 0.0));
        assert!((ecef.x - WGS84_A).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_ecef_roundtrip_recovers_altitude() {
        let p = Geodetic::new(40.0, -74.0, 123.456);
        let back = ecef_to_geodetic(&geodetic_to_ecef(&p));
        assert!((back.lat - p.lat).abs() < 1e-10);
        assert!((back.lon - p.lon).abs() < 1e-10);
        assert!((back.alt - p.alt).abs() < 1e-4);
    }

    #[test]
    fn test_reference_is_origin() {
        let r = Geodetic::new(32.8, -97.1, 180.0);
        let ned = geodetic_to_ned(&r, &r);
        assert!(ned.norm() < 1e-9);
    }

    #[test]
    fn test_north_offset_moves_latitude_only() {
        let r = Geodetic::new(40.0, -74.0, 10.0);
        let p = ned_to_geodetic(&Ned::new(100.0, 0.0, 0.0), &r);
        assert!(p.lat > r.lat);
        assert!((p.lon - r.lon).abs() < 1e-9);
        let approx_deg = 100.0 / METRES_PER_DEG_LAT;
        assert!((p.lat - r.lat - approx_deg).abs() < 1e-5);
    }

    #[test]
    fn test_east_offset_moves_longitude_positive() {
        let r = Geodetic::new(40.0, -74.0, 10.0);
        let p = ned_to_geodetic(&Ned::new(0.0, 50.0, 0.0), &r);
        assert!(p.lon > r.lon);
    }

    #[test]
    fn test_down_offset_lowers_altitude() {
        let r = Geodetic::new(40.0, -74.0, 10.0);
        let p = ned_to_geodetic(&Ned::new(0.0, 0.0, -1.0), &r);
        assert!((p.alt - 11.0).abs() < 1e-6);

        let q = ned_to_geodetic(&Ned::new(0.0, 0.0, 4.0), &r);
        assert!((q.alt - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_ned_roundtrip_within_centimetre() {
        let references = [
            Geodetic::new(40.0, -74.0, 10.0),
            Geodetic::new(-33.86, 151.21, 58.0),
            Geodetic::new(64.13, -21.9, 0.0),
            Geodetic::new(0.0, 0.0, 0.0),
        ];
        let offsets = [
            Ned::new(0.0, 0.0, 0.0),
            Ned::new(250.0, -125.0, -30.0),
            Ned::new(-400.0, 399.0, 5.0),
            Ned::new(0.37, 0.11, -0.05),
        ];

        for reference in &references {
            for offset in &offsets {
                let p = ned_to_geodetic(offset, reference);
                let back = geodetic_to_ned(&p, reference);
                assert!((back.north - offset.north).abs() < 0.01);
                assert!((back.east - offset.east).abs() < 0.01);
                assert!((back.down - offset.down).abs() < 0.01);

                let again = ned_to_geodetic(&back, reference);
                assert_close(&again, &p, 0.01);
            }
        }
    }

    #[test]
    fn test_geodetic_roundtrip_within_centimetre() {
        let reference = Geodetic::new(40.0, -74.0, 10.0);
        let point = Geodetic::new(40.002, -73.998, 42.0);
        let ned = geodetic_to_ned(&point, &reference);
        let back = ned_to_geodetic(&ned, &reference);
        assert_close(&back, &point, 0.01);
        assert!((back.alt - point.alt).abs() < 0.01);
    }
}
