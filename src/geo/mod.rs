//! # Coordinate Transform Module
//!
//! Geodetic (WGS84 latitude/longitude/altitude) and local North-East-Down
//! conversions.
//!
//! This module handles:
//! - Geodetic to ECEF (earth-centred, earth-fixed) conversion
//! - ECEF to geodetic conversion (iterative, sub-millimetre)
//! - Geodetic point to NED offset relative to a reference point
//! - NED offset relative to a reference point back to geodetic
//!
//! All functions are pure. Angles are in degrees, distances in metres.

pub mod ned;

pub use ned::{ecef_to_geodetic, geodetic_to_ecef, geodetic_to_ned, ned_to_geodetic};

/// WGS84 semi-major axis in metres
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// A point on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Altitude in metres
    pub alt: f64,
}

impl Geodetic {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

/// An offset in the local tangent plane of some reference point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ned {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

impl Ned {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }

    /// Euclidean length of the offset
    pub fn norm(&self) -> f64 {
        (self.north * self.north + self.east * self.east + self.down * self.down).sqrt()
    }
}

/// Earth-centred, earth-fixed cartesian coordinates in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ecef {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 3D distance in metres between two geodetic points
///
/// Computed as the length of `b` expressed in the NED frame of `a`.
pub fn distance(a: &Geodetic, b: &Geodetic) -> f64 {
    geodetic_to_ned(b, a).norm()
}
