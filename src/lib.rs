//! # FCM Control Library
//!
//! Command-and-control layer for a PX4 flight controller.
//!
//! Turns action requests and position telemetry from a pub/sub bus into
//! flight-controller commands: single-flight action dispatch with a deadline,
//! NED goto with arrival detection, and mission/geofence upload.

pub mod actions;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod fcc;
pub mod geo;
pub mod mission;
pub mod state;

pub use control::ControlModule;
pub use error::{FcmError, Result};
