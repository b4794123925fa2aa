//! # Actions Module
//!
//! The fixed set of vehicle actions and the machinery that runs them.
//!
//! This module handles:
//! - Decoding inbound `{action, payload}` requests into [`Action`]
//! - Single-flight dispatch with a deadline ([`dispatcher`])
//! - Per-action handlers driving the flight controller ([`handlers`])
//! - Goto commands and arrival detection ([`goto`])
//! - The queue loop feeding the dispatcher ([`queue`])
//!
//! ## Supported actions
//!
//! | Name | Payload |
//! |------|---------|
//! | `break` | - (sleeps past the deadline, for testing timeouts) |
//! | `connect`, `arm`, `disarm`, `kill`, `land`, `reboot` | - |
//! | `takeoff` | `{alt}` |
//! | `goto_location` | `{lat, lon, alt, heading}` |
//! | `goto_location_ned` | `{n, e, d, heading, rel}` |
//! | `upload_mission` | `{waypoints: [...]}` |
//! | `start_mission` | - |
//! | `set_geofence` | `{min_lat, min_lon, max_lat, max_lon}` |

pub mod dispatcher;
pub mod goto;
pub mod handlers;
pub mod queue;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FcmError, Result};
use crate::mission::Waypoint;

pub use dispatcher::Dispatcher;
pub use goto::GotoMonitor;
pub use handlers::ActionHandlers;
pub use queue::run_action_queue;

/// Raw inbound request as published on the action topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

impl ActionRequest {
    pub fn new(action: &str, payload: Value) -> Self {
        Self { action: action.to_string(), payload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TakeoffPayload {
    /// Takeoff altitude relative to home in metres
    pub alt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GotoLocationPayload {
    pub lat: f64,
    pub lon: f64,
    /// Altitude AMSL in metres
    pub alt: f64,
    #[serde(default)]
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GotoLocationNedPayload {
    pub n: f64,
    pub e: f64,
    pub d: f64,
    #[serde(default)]
    pub heading: f32,
    /// Offset from the current position instead of home
    #[serde(default, alias = "rel")]
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadMissionPayload {
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeofencePayload {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// A decoded vehicle action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Break,
    Connect,
    Arm,
    Disarm,
    Kill,
    Land,
    Reboot,
    Takeoff(TakeoffPayload),
    GotoLocation(GotoLocationPayload),
    GotoLocationNed(GotoLocationNedPayload),
    UploadMission(UploadMissionPayload),
    StartMission,
    SetGeofence(GeofencePayload),
}

/// Treat empty, null and JSON-in-a-string payloads uniformly
fn normalize_payload(payload: Value) -> Value {
    match payload {
        Value::Null => Value::Object(Default::default()),
        Value::String(s) if s.trim().is_empty() => Value::Object(Default::default()),
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

impl Action {
    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            Action::Break => "break",
            Action::Connect => "connect",
            Action::Arm => "arm",
            Action::Disarm => "disarm",
            Action::Kill => "kill",
            Action::Land => "land",
            Action::Reboot => "reboot",
            Action::Takeoff(_) => "takeoff",
            Action::GotoLocation(_) => "goto_location",
            Action::GotoLocationNed(_) => "goto_location_ned",
            Action::UploadMission(_) => "upload_mission",
            Action::StartMission => "start_mission",
            Action::SetGeofence(_) => "set_geofence",
        }
    }

    /// Decode a raw request
    ///
    /// # Errors
    ///
    /// - `UnknownAction` if the name is not one of the supported actions
    /// - `InvalidPayload` if the payload does not fit the action
    pub fn from_request(request: ActionRequest) -> Result<Self> {
        let ActionRequest { action, payload } = request;
        let payload = normalize_payload(payload);

        fn decode<T: serde::de::DeserializeOwned>(action: &str, payload: Value) -> Result<T> {
            serde_json::from_value(payload).map_err(|source| FcmError::InvalidPayload {
                action: action.to_string(),
                source,
            })
        }

        let decoded = match action.as_str() {
            "break" => Action::Break,
            "connect" => Action::Connect,
            "arm" => Action::Arm,
            "disarm" => Action::Disarm,
            "kill" => Action::Kill,
            "land" => Action::Land,
            "reboot" => Action::Reboot,
            "takeoff" => Action::Takeoff(decode(&action, payload)?),
            "goto_location" => Action::GotoLocation(decode(&action, payload)?),
            "goto_location_ned" => Action::GotoLocationNed(decode(&action, payload)?),
            "upload_mission" => Action::UploadMission(decode(&action, payload)?),
            "start_mission" => Action::StartMission,
            "set_geofence" => Action::SetGeofence(decode(&action, payload)?),
            _ => return Err(FcmError::UnknownAction(action)),
        };

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::WaypointKind;
    use serde_json::json;

    fn decode(action: &str, payload: Value) -> Result<Action> {
        Action::from_request(ActionRequest::new(action, payload))
    }

    #[test]
    fn test_simple_actions_ignore_payload() {
        for name in ["break", "connect", "arm", "disarm", "kill", "land", "reboot", "start_mission"] {
            let action = decode(name, json!({})).unwrap();
            assert_eq!(action.name(), name);
        }
    }

    #[test]
    fn test_empty_string_payload_normalized() {
        assert_eq!(decode("arm", json!("")).unwrap(), Action::Arm);
        assert_eq!(decode("arm", Value::Null).unwrap(), Action::Arm);
    }

    #[test]
    fn test_stringified_payload_parsed() {
        let action = decode("takeoff", json!("{\"alt\": 3.0}")).unwrap();
        assert_eq!(action, Action::Takeoff(TakeoffPayload { alt: 3.0 }));
    }

    #[test]
    fn test_unknown_action() {
        match decode("barrel_roll", json!({})) {
            Err(FcmError::UnknownAction(name)) => assert_eq!(name, "barrel_roll"),
            other => panic!("Expected UnknownAction, got: {:?}", other),
        }
    }

    #[test]
    fn test_missing_payload_field() {
        match decode("takeoff", json!({})) {
            Err(FcmError::InvalidPayload { action, .. }) => assert_eq!(action, "takeoff"),
            other => panic!("Expected InvalidPayload, got: {:?}", other),
        }
    }

    #[test]
    fn test_goto_ned_rel_alias() {
        let action = decode("goto_location_ned", json!({"n": 1, "e": 2, "d": -3, "heading": 0, "rel": true})).unwrap();
        match action {
            Action::GotoLocationNed(p) => {
                assert!(p.relative);
                assert_eq!(p.d, -3.0);
            }
            other => panic!("Expected GotoLocationNed, got: {:?}", other),
        }
    }

    #[test]
    fn test_goto_ned_relative_defaults_false() {
        let action = decode("goto_location_ned", json!({"n": 1, "e": 2, "d": -3})).unwrap();
        assert!(matches!(action, Action::GotoLocationNed(p) if !p.relative && p.heading == 0.0));
    }

    #[test]
    fn test_upload_mission_payload() {
        let action = decode(
            "upload_mission",
            json!({"waypoints": [
                {"type": "goto", "n": 0, "e": 0, "d": -1},
                {"type": "land", "n": 0, "e": 0, "d": 0}
            ]}),
        )
        .unwrap();
        match action {
            Action::UploadMission(p) => {
                assert_eq!(p.waypoints.len(), 2);
                assert_eq!(p.waypoints[1].kind, WaypointKind::Land);
            }
            other => panic!("Expected UploadMission, got: {:?}", other),
        }
    }

    #[test]
    fn test_geofence_payload() {
        let action = decode("set_geofence", json!({"min_lat": 10, "min_lon": 20, "max_lat": 11, "max_lon": 21})).unwrap();
        assert_eq!(
            action,
            Action::SetGeofence(GeofencePayload { min_lat: 10.0, min_lon: 20.0, max_lat: 11.0, max_lon: 21.0 })
        );
    }
}
