//! # Flight Controller Module
//!
//! Capability boundary to the flight-control computer (FCC).
//!
//! This module handles:
//! - The async [`FlightController`] trait the control layer drives
//! - Error types reported by controller primitives
//! - A simulated controller for running without hardware
//!
//! The real MAVLink link lives outside this crate; anything implementing
//! the trait can be plugged in.

pub mod sim;

use async_trait::async_trait;
use thiserror::Error;

use crate::geo::Geodetic;
use crate::mission::protocol::{MissionItem, Polygon};

pub use sim::SimulatedFlightController;

/// Outcome code attached to a rejected action primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Unknown,
    NoSystem,
    ConnectionError,
    Busy,
    CommandDenied,
    CommandDeniedLandedStateUnknown,
    CommandDeniedNotLanded,
    Timeout,
    VtolTransitionSupportUnknown,
    NoVtolTransitionSupport,
    ParameterError,
    Unsupported,
    Failed,
}

impl ActionResult {
    /// Upper-case result string as reported by the controller link
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionResult::Unknown => "UNKNOWN",
            ActionResult::NoSystem => "NO_SYSTEM",
            ActionResult::ConnectionError => "CONNECTION_ERROR",
            ActionResult::Busy => "BUSY",
            ActionResult::CommandDenied => "COMMAND_DENIED",
            ActionResult::CommandDeniedLandedStateUnknown => "COMMAND_DENIED_LANDED_STATE_UNKNOWN",
            ActionResult::CommandDeniedNotLanded => "COMMAND_DENIED_NOT_LANDED",
            ActionResult::Timeout => "TIMEOUT",
            ActionResult::VtolTransitionSupportUnknown => "VTOL_TRANSITION_SUPPORT_UNKNOWN",
            ActionResult::NoVtolTransitionSupport => "NO_VTOL_TRANSITION_SUPPORT",
            ActionResult::ParameterError => "PARAMETER_ERROR",
            ActionResult::Unsupported => "UNSUPPORTED",
            ActionResult::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ActionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by flight-controller primitives
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FccError {
    /// An action primitive (arm, takeoff, goto...) was rejected
    #[error("action rejected ({result}): {message}")]
    Action { result: ActionResult, message: String },

    /// Mission clear/upload/start was rejected
    #[error("mission rejected: {reason}")]
    Mission { reason: String },

    /// Geofence upload was rejected
    #[error("geofence rejected: {reason}")]
    Geofence { reason: String },

    /// A telemetry sample could not be obtained
    #[error("telemetry unavailable: {0}")]
    Telemetry(String),
}

impl FccError {
    pub fn action(result: ActionResult, message: impl Into<String>) -> Self {
        FccError::Action { result, message: message.into() }
    }

    /// True when the rejection means the link itself is down
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, FccError::Action { result: ActionResult::ConnectionError, .. })
    }
}

/// Result type for controller primitives
pub type FccResult<T> = std::result::Result<T, FccError>;

/// Primitives offered by the flight-control computer
///
/// Altitudes passed to [`FlightController::goto_location`] are AMSL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlightController: Send + Sync {
    /// (Re)establish the link
    async fn connect(&self) -> FccResult<()>;

    async fn arm(&self) -> FccResult<()>;

    async fn disarm(&self) -> FccResult<()>;

    /// Cut motors immediately, in the air or not
    async fn kill(&self) -> FccResult<()>;

    async fn reboot(&self) -> FccResult<()>;

    /// Land at the current position
    async fn land(&self) -> FccResult<()>;

    /// Take off to the configured takeoff altitude
    async fn takeoff(&self) -> FccResult<()>;

    /// Set the altitude (relative to home) used by [`FlightController::takeoff`]
    async fn set_takeoff_altitude(&self, altitude_m: f32) -> FccResult<()>;

    /// Fly directly to an absolute position
    async fn goto_location(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_amsl_m: f32,
        yaw_deg: f32,
    ) -> FccResult<()>;

    /// Wait for and return the next raw GPS fix
    async fn raw_position(&self) -> FccResult<Geodetic>;

    async fn clear_mission(&self) -> FccResult<()>;

    async fn upload_mission(&self, items: Vec<MissionItem>) -> FccResult<()>;

    async fn start_mission(&self) -> FccResult<()>;

    async fn upload_geofence(&self, polygons: Vec<Polygon>) -> FccResult<()>;
}
