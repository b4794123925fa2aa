//! # Mission Module
//!
//! Translation of declarative waypoints into the flight controller's
//! native mission protocol.
//!
//! This module handles:
//! - MAVLink mission constants and item/geofence types
//! - Decoding and validating waypoints from action payloads
//! - Building MISSION_ITEM_INT lists relative to the home position

pub mod protocol;
pub mod waypoint;
pub mod builder;

pub use builder::MissionBuilder;
pub use protocol::{FencePoint, MissionItem, Polygon};
pub use waypoint::{Waypoint, WaypointKind, WaypointLocation};
