//! # Mission Waypoints
//!
//! Declarative mission legs as they arrive in an `upload_mission` payload.
//!
//! ## Wire format
//!
//! ```json
//! {"type": "goto", "n": 5.0, "e": 0.0, "d": -2.0, "yaw": 90, "holdTime": 1, "acceptRadius": 0.1}
//! ```
//!
//! | Field | Meaning | Default |
//! |-------|---------|---------|
//! | `type` | `takeoff`, `goto`, `land` or `loiter` | required |
//! | `n`, `e`, `d` | NED offset from home in metres | - |
//! | `lat`, `lon`, `alt` | global position, `alt` relative to home | `alt` = 0 |
//! | `yaw` | heading at the waypoint in degrees | 0 |
//! | `holdTime` | seconds to hold at a `goto` | 0 |
//! | `acceptRadius` | `goto` acceptance radius in metres | 0.10 |
//!
//! A waypoint carries either a full NED offset or a lat/lon pair. Only the
//! first waypoint may carry neither; it is then placed at a fresh GPS fix.

use serde::Deserialize;

use crate::geo::Ned;

/// Acceptance radius used when a goto waypoint does not specify one
pub const DEFAULT_ACCEPT_RADIUS_M: f32 = 0.10;

/// Mission leg type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Takeoff,
    Goto,
    Land,
    Loiter,
}

/// Where a waypoint is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaypointLocation {
    /// Offset from home
    Local(Ned),
    /// Absolute lat/lon, altitude relative to home
    Global { lat: f64, lon: f64, alt: f64 },
    /// At the vehicle's next raw GPS fix, altitude relative to home
    CurrentFix { alt: f64 },
}

/// A mission leg
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawWaypoint")]
pub struct Waypoint {
    pub kind: WaypointKind,
    pub location: WaypointLocation,
    pub yaw: f32,
    pub hold_time: f32,
    pub accept_radius: f32,
}

impl Waypoint {
    /// Waypoint at a NED offset from home with default yaw/hold/radius
    pub fn local(kind: WaypointKind, n: f64, e: f64, d: f64) -> Self {
        Self {
            kind,
            location: WaypointLocation::Local(Ned::new(n, e, d)),
            yaw: 0.0,
            hold_time: 0.0,
            accept_radius: DEFAULT_ACCEPT_RADIUS_M,
        }
    }

    /// True when the waypoint must be placed at a fresh GPS fix
    pub fn needs_fix(&self) -> bool {
        matches!(self.location, WaypointLocation::CurrentFix { .. })
    }
}

#[derive(Debug, Deserialize)]
struct RawWaypoint {
    #[serde(rename = "type")]
    kind: WaypointKind,
    n: Option<f64>,
    e: Option<f64>,
    d: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    #[serde(default)]
    yaw: f32,
    #[serde(default, rename = "holdTime", alias = "hold_time")]
    hold_time: f32,
    #[serde(default = "default_accept_radius", rename = "acceptRadius", alias = "accept_radius")]
    accept_radius: f32,
}

fn default_accept_radius() -> f32 { DEFAULT_ACCEPT_RADIUS_M }

impl TryFrom<RawWaypoint> for Waypoint {
    type Error = String;

    fn try_from(raw: RawWaypoint) -> std::result::Result<Self, Self::Error> {
        let location = match (raw.n, raw.e, raw.d, raw.lat, raw.lon) {
            (Some(n), Some(e), Some(d), _, _) => WaypointLocation::Local(Ned::new(n, e, d)),
            (None, None, None, Some(lat), Some(lon)) => WaypointLocation::Global {
                lat,
                lon,
                alt: raw.alt.unwrap_or(0.0),
            },
            (None, None, None, None, None) => WaypointLocation::CurrentFix {
                alt: raw.alt.unwrap_or(0.0),
            },
            (None, None, None, _, _) => {
                return Err("waypoint needs both lat and lon".to_string());
            }
            _ => return Err("waypoint needs all of n, e and d".to_string()),
        };

        if raw.accept_radius < 0.0 {
            return Err(format!("acceptRadius must not be negative, got {}", raw.accept_radius));
        }

        Ok(Waypoint {
            kind: raw.kind,
            location,
            yaw: raw.yaw,
            hold_time: raw.hold_time,
            accept_radius: raw.accept_radius,
        })
    }
}
