//! # Error Types
//!
//! Custom error types for FCM Control using `thiserror`.

use thiserror::Error;

use crate::fcc::FccError;

/// Main error type for FCM Control
#[derive(Debug, Error)]
pub enum FcmError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bus payload (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another action already occupies the dispatcher
    #[error("Dispatcher busy running '{active}', rejected '{rejected}'")]
    DispatcherBusy { active: String, rejected: String },

    /// The flight controller rejected a primitive
    #[error("Flight controller error: {0}")]
    Action(#[from] FccError),

    /// Waypoints could not be turned into mission items
    #[error("Mission build error: {0}")]
    MissionBuild(String),

    /// Telemetry required by a command has not arrived yet
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Action name outside the supported set
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Payload does not match the action's schema
    #[error("Invalid payload for '{action}': {source}")]
    InvalidPayload {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for FCM Control
pub type Result<T> = std::result::Result<T, FcmError>;
