//! # Simulated Flight Controller
//!
//! In-memory stand-in for the FCC link. Movements complete instantly;
//! the interesting part is which commands it accepts in which state.
//!
//! Used by the binary when no hardware link is configured and by tests
//! that need a controller with realistic preconditions.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{ActionResult, FccError, FccResult, FlightController};
use crate::bus::BusMessage;
use crate::config::BusConfig;
use crate::geo::Geodetic;
use crate::mission::protocol::{MissionItem, Polygon, COORDINATE_SCALE};

#[derive(Debug)]
struct SimState {
    connected: bool,
    armed: bool,
    in_air: bool,
    takeoff_altitude_m: f32,
    home: Geodetic,
    position: Geodetic,
    mission: Vec<MissionItem>,
    geofence: Vec<Polygon>,
}

/// Simulated flight controller
#[derive(Debug)]
pub struct SimulatedFlightController {
    state: Mutex<SimState>,
}

impl SimulatedFlightController {
    /// Create a disconnected, disarmed vehicle sitting at `home` (altitude AMSL)
    pub fn new(home: Geodetic) -> Self {
        Self {
            state: Mutex::new(SimState {
                connected: false,
                armed: false,
                in_air: false,
                takeoff_altitude_m: 2.5,
                home,
                position: home,
                mission: Vec::new(),
                geofence: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the state after checking the link is up
    fn linked(&self) -> FccResult<MutexGuard<'_, SimState>> {
        let state = self.lock();
        if !state.connected {
            return Err(FccError::action(ActionResult::ConnectionError, "not connected"));
        }
        Ok(state)
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    pub fn is_in_air(&self) -> bool {
        self.lock().in_air
    }

    /// Current position, altitude AMSL
    pub fn position(&self) -> Geodetic {
        self.lock().position
    }

    pub fn mission(&self) -> Vec<MissionItem> {
        self.lock().mission.clone()
    }

    pub fn geofence(&self) -> Vec<Polygon> {
        self.lock().geofence.clone()
    }

    /// Position and home telemetry as they would appear on the bus
    pub fn telemetry_messages(&self, topics: &BusConfig) -> [BusMessage; 2] {
        let state = self.lock();
        [
            BusMessage::new(
                &topics.global_position_topic,
                json!({
                    "lat": state.position.lat,
                    "lon": state.position.lon,
                    "rel_alt": state.position.alt - state.home.alt,
                }),
            ),
            BusMessage::new(
                &topics.home_position_topic,
                json!({
                    "lat": state.home.lat,
                    "lon": state.home.lon,
                    "abs_alt": state.home.alt,
                }),
            ),
        ]
    }
}

#[async_trait]
impl FlightController for SimulatedFlightController {
    async fn connect(&self) -> FccResult<()> {
        self.lock().connected = true;
        info!("Simulated FCC connected");
        Ok(())
    }

    async fn arm(&self) -> FccResult<()> {
        self.linked()?.armed = true;
        Ok(())
    }

    async fn disarm(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        if state.in_air {
            return Err(FccError::action(ActionResult::CommandDeniedNotLanded, "vehicle is in the air"));
        }
        state.armed = false;
        Ok(())
    }

    async fn kill(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        state.armed = false;
        state.in_air = false;
        state.position.alt = state.home.alt;
        Ok(())
    }

    async fn reboot(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        if state.armed {
            return Err(FccError::action(ActionResult::CommandDenied, "cannot reboot while armed"));
        }
        state.mission.clear();
        Ok(())
    }

    async fn land(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        if !state.in_air {
            return Err(FccError::action(ActionResult::CommandDenied, "vehicle is not flying"));
        }
        state.in_air = false;
        state.armed = false;
        state.position.alt = state.home.alt;
        Ok(())
    }

    async fn takeoff(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        if !state.armed {
            return Err(FccError::action(ActionResult::CommandDenied, "vehicle is not armed"));
        }
        state.in_air = true;
        state.position.alt = state.home.alt + state.takeoff_altitude_m as f64;
        Ok(())
    }

    async fn set_takeoff_altitude(&self, altitude_m: f32) -> FccResult<()> {
        if altitude_m <= 0.0 {
            return Err(FccError::action(ActionResult::ParameterError, "takeoff altitude must be positive"));
        }
        self.linked()?.takeoff_altitude_m = altitude_m;
        Ok(())
    }

    async fn goto_location(
        &self,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_amsl_m: f32,
        yaw_deg: f32,
    ) -> FccResult<()> {
        let mut state = self.linked()?;
        if !state.armed {
            return Err(FccError::action(ActionResult::CommandDenied, "vehicle is not armed"));
        }
        debug!("Simulated goto heading {}", yaw_deg);
        state.in_air = true;
        state.position = Geodetic::new(latitude_deg, longitude_deg, altitude_amsl_m as f64);
        Ok(())
    }

    async fn raw_position(&self) -> FccResult<Geodetic> {
        Ok(self.linked()?.position)
    }

    async fn clear_mission(&self) -> FccResult<()> {
        self.linked()?.mission.clear();
        Ok(())
    }

    async fn upload_mission(&self, items: Vec<MissionItem>) -> FccResult<()> {
        let mut state = self.linked()?;
        if items.is_empty() {
            return Err(FccError::Mission { reason: "INVALID_ARGUMENT".to_string() });
        }
        state.mission = items;
        Ok(())
    }

    async fn start_mission(&self) -> FccResult<()> {
        let mut state = self.linked()?;
        if !state.armed {
            return Err(FccError::Mission { reason: "DENIED".to_string() });
        }
        let Some(last) = state.mission.last().copied() else {
            return Err(FccError::Mission { reason: "NO_MISSION_AVAILABLE".to_string() });
        };
        state.in_air = true;
        state.position = Geodetic::new(
            last.x as f64 / COORDINATE_SCALE,
            last.y as f64 / COORDINATE_SCALE,
            last.z as f64,
        );
        Ok(())
    }

    async fn upload_geofence(&self, polygons: Vec<Polygon>) -> FccResult<()> {
        let mut state = self.linked()?;
        if polygons.iter().any(|p| p.points.len() < 3) {
            return Err(FccError::Geofence { reason: "INVALID_ARGUMENT".to_string() });
        }
        state.geofence = polygons;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Geodetic {
        Geodetic::new(40.0, -74.0, 10.0)
    }

    #[tokio::test]
    async fn test_commands_fail_before_connect() {
        let fcc = SimulatedFlightController::new(home());
        let err = fcc.arm().await.unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn test_takeoff_requires_arm() {
        let fcc = SimulatedFlightController::new(home());
        fcc.connect().await.unwrap();
        assert!(fcc.takeoff().await.is_err());

        fcc.set_takeoff_altitude(5.0).await.unwrap();
        fcc.arm().await.unwrap();
        fcc.takeoff().await.unwrap();
        assert!(fcc.is_in_air());
        assert!((fcc.position().alt - 15.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_disarm_refused_in_air() {
        let fcc = SimulatedFlightController::new(home());
        fcc.connect().await.unwrap();
        fcc.arm().await.unwrap();
        fcc.takeoff().await.unwrap();
        assert!(fcc.disarm().await.is_err());
        fcc.land().await.unwrap();
        assert!(!fcc.is_armed());
    }

    #[tokio::test]
    async fn test_start_mission_without_upload() {
        let fcc = SimulatedFlightController::new(home());
        fcc.connect().await.unwrap();
        fcc.arm().await.unwrap();
        let err = fcc.start_mission().await.unwrap_err();
        assert_eq!(err, FccError::Mission { reason: "NO_MISSION_AVAILABLE".to_string() });
    }

    #[tokio::test]
    async fn test_telemetry_messages_report_relative_altitude() {
        let fcc = SimulatedFlightController::new(home());
        fcc.connect().await.unwrap();
        fcc.arm().await.unwrap();
        fcc.goto_location(40.001, -74.0, 14.0, 0.0).await.unwrap();

        let topics = BusConfig::default();
        let [current, home_msg] = fcc.telemetry_messages(&topics);
        assert_eq!(current.topic, topics.global_position_topic);
        assert!((current.payload["rel_alt"].as_f64().unwrap() - 4.0).abs() < 1e-4);
        assert_eq!(home_msg.payload["abs_alt"].as_f64().unwrap(), 10.0);
    }
}
