//! # Mission Builder
//!
//! Converts waypoints into MISSION_ITEM_INT items.
//!
//! ## Parameter layout
//!
//! | Type | Command | param1 | param2 | param3 | param4 |
//! |------|---------|--------|--------|--------|--------|
//! | takeoff | NAV_TAKEOFF | pitch | - | - | yaw |
//! | goto | NAV_WAYPOINT | hold time | acceptance radius | 0 (pass through) | yaw |
//! | land | NAV_LAND | 0 (default abort alt) | precision land disabled | - | yaw |
//! | loiter | NAV_LOITER_UNLIM | - | - | 0 | yaw |
//!
//! Unused parameters are NaN. Every item uses the global integer frame with
//! altitude AMSL (waypoint altitude + home altitude).

use tracing::debug;

use super::protocol::*;
use super::waypoint::{Waypoint, WaypointKind, WaypointLocation};
use crate::config::MissionConfig;
use crate::error::{FcmError, Result};
use crate::geo::{ned_to_geodetic, Geodetic};

/// Relative altitudes closer to zero than this count as "at ground level"
const ZERO_ALTITUDE_TOLERANCE_M: f64 = 0.01;

/// Encodes waypoint lists into mission items
#[derive(Debug, Clone)]
pub struct MissionBuilder {
    takeoff_pitch_deg: f32,
    zero_altitude_epsilon_m: f64,
}

impl MissionBuilder {
    pub fn new(config: &MissionConfig) -> Self {
        Self {
            takeoff_pitch_deg: config.takeoff_pitch_deg,
            zero_altitude_epsilon_m: config.zero_altitude_epsilon_m,
        }
    }

    /// Build mission items from `waypoints`
    ///
    /// # Arguments
    ///
    /// * `waypoints` - Ordered mission legs; must not be empty
    /// * `home` - Captured home position, altitude AMSL
    /// * `first_fix` - Raw GPS fix used when the first waypoint has no position
    ///
    /// # Errors
    ///
    /// Returns `MissionBuild` if the list is empty, a waypoint other than the
    /// first has no position, the first needs a fix and none was given, or the
    /// sequence numbers would overflow `u16`.
    pub fn build(
        &self,
        waypoints: &[Waypoint],
        home: &Geodetic,
        first_fix: Option<Geodetic>,
    ) -> Result<Vec<MissionItem>> {
        if waypoints.is_empty() {
            return Err(FcmError::MissionBuild("mission has no waypoints".to_string()));
        }

        waypoints
            .iter()
            .enumerate()
            .map(|(seq, waypoint)| -> Result<MissionItem> {
                let index = u16::try_from(seq).map_err(|_| {
                    FcmError::MissionBuild(format!("mission exceeds {} items", u16::MAX as usize + 1))
                })?;
                let (lat, lon, rel_alt) = self.resolve(seq, waypoint, home, first_fix)?;
                Ok(self.encode(index, waypoint, lat, lon, rel_alt + home.alt))
            })
            .collect()
    }

    /// Resolve a waypoint to (lat, lon, altitude relative to home)
    fn resolve(
        &self,
        seq: usize,
        waypoint: &Waypoint,
        home: &Geodetic,
        first_fix: Option<Geodetic>,
    ) -> Result<(f64, f64, f64)> {
        let (lat, lon, rel_alt) = match waypoint.location {
            WaypointLocation::Local(offset) => {
                let point = ned_to_geodetic(&offset, home);
                (point.lat, point.lon, point.alt - home.alt)
            }
            WaypointLocation::Global { lat, lon, alt } => (lat, lon, alt),
            WaypointLocation::CurrentFix { alt } => {
                if seq != 0 {
                    return Err(FcmError::MissionBuild(format!(
                        "waypoint {} has no position; only the first waypoint may omit it",
                        seq
                    )));
                }
                let fix = first_fix.ok_or_else(|| {
                    FcmError::MissionBuild("first waypoint needs a GPS fix but none is available".to_string())
                })?;
                (fix.lat, fix.lon, alt)
            }
        };

        // PX4 rejects legs at exactly home altitude, most visibly landings
        if rel_alt.abs() < ZERO_ALTITUDE_TOLERANCE_M {
            debug!("Waypoint {} altitude {:.4} m raised to {} m", seq, rel_alt, self.zero_altitude_epsilon_m);
            return Ok((lat, lon, self.zero_altitude_epsilon_m));
        }

        Ok((lat, lon, rel_alt))
    }

    fn encode(&self, seq: u16, waypoint: &Waypoint, lat: f64, lon: f64, alt_amsl: f64) -> MissionItem {
        let (command, param1, param2, param3) = match waypoint.kind {
            WaypointKind::Takeoff => (MAV_CMD_NAV_TAKEOFF, self.takeoff_pitch_deg, f32::NAN, f32::NAN),
            WaypointKind::Goto => (MAV_CMD_NAV_WAYPOINT, waypoint.hold_time, waypoint.accept_radius, 0.0),
            WaypointKind::Land => (MAV_CMD_NAV_LAND, 0.0, PRECISION_LAND_MODE_DISABLED, f32::NAN),
            WaypointKind::Loiter => (MAV_CMD_NAV_LOITER_UNLIM, f32::NAN, f32::NAN, 0.0),
        };

        MissionItem {
            seq,
            frame: MAV_FRAME_GLOBAL_INT,
            command,
            current: u8::from(seq == 0),
            autocontinue: 1,
            param1,
            param2,
            param3,
            param4: waypoint.yaw,
            x: to_fixed_point(lat),
            y: to_fixed_point(lon),
            z: alt_amsl as f32,
            mission_type: MAV_MISSION_TYPE_MISSION,
        }
    }
}
