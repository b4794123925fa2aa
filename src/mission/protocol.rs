//! # MAVLink Mission Protocol Constants and Types
//!
//! The subset of MAVLink common definitions used when encoding missions
//! and geofences for the flight controller.

/// MAV_FRAME_GLOBAL_INT: lat/lon as degrees * 1e7, altitude AMSL
pub const MAV_FRAME_GLOBAL_INT: u8 = 5;

/// MAV_CMD_NAV_WAYPOINT
pub const MAV_CMD_NAV_WAYPOINT: u16 = 16;

/// MAV_CMD_NAV_LOITER_UNLIM
pub const MAV_CMD_NAV_LOITER_UNLIM: u16 = 17;

/// MAV_CMD_NAV_LAND
pub const MAV_CMD_NAV_LAND: u16 = 21;

/// MAV_CMD_NAV_TAKEOFF
pub const MAV_CMD_NAV_TAKEOFF: u16 = 22;

/// MAV_MISSION_TYPE_MISSION
pub const MAV_MISSION_TYPE_MISSION: u8 = 0;

/// PRECISION_LAND_MODE_DISABLED
pub const PRECISION_LAND_MODE_DISABLED: f32 = 0.0;

/// Scale between degrees and MISSION_ITEM_INT fixed-point coordinates
pub const COORDINATE_SCALE: f64 = 1e7;

/// One leg of a mission in MISSION_ITEM_INT form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    /// Sequence number (0-indexed, contiguous)
    pub seq: u16,
    /// Coordinate frame (always [`MAV_FRAME_GLOBAL_INT`] here)
    pub frame: u8,
    /// MAV_CMD command id
    pub command: u16,
    /// 1 for the item the mission starts at, else 0
    pub current: u8,
    /// 1 to continue to the next item automatically
    pub autocontinue: u8,
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    /// Yaw in degrees for all supported commands
    pub param4: f32,
    /// Latitude in degrees * 1e7
    pub x: i32,
    /// Longitude in degrees * 1e7
    pub y: i32,
    /// Altitude in metres AMSL
    pub z: f32,
    pub mission_type: u8,
}

/// Encode degrees as a MISSION_ITEM_INT fixed-point coordinate
pub fn to_fixed_point(degrees: f64) -> i32 {
    (degrees * COORDINATE_SCALE).round() as i32
}

/// Geofence polygon vertex in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FencePoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl FencePoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self { latitude_deg, longitude_deg }
    }
}

/// Inclusion geofence polygon; the vehicle must stay inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<FencePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_ids_match_mavlink_common() {
        assert_eq!(MAV_CMD_NAV_WAYPOINT, 16);
        assert_eq!(MAV_CMD_NAV_LOITER_UNLIM, 17);
        assert_eq!(MAV_CMD_NAV_LAND, 21);
        assert_eq!(MAV_CMD_NAV_TAKEOFF, 22);
        assert_eq!(MAV_FRAME_GLOBAL_INT, 5);
    }

    #[test]
    fn test_fixed_point_scaling() {
        assert_eq!(to_fixed_point(40.0), 400_000_000);
        assert_eq!(to_fixed_point(-74.0), -740_000_000);
        assert_eq!(to_fixed_point(39.999_999_999_999_99), 400_000_000);
        assert_eq!(to_fixed_point(0.000_000_1), 1);
    }
}
