//! # Action Handlers
//!
//! One async handler per supported action, all driving the
//! [`FlightController`] and reporting outcomes as events.
//!
//! Simple actions (arm, disarm, kill, land, reboot) share
//! [`ActionHandlers::run_simple`]: success publishes `<action>_success_event`,
//! a rejection publishes `<action>_failed_event` and is returned to the
//! dispatcher. A rejection caused by a dropped link also kicks off a
//! background reconnect.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{Action, GeofencePayload, UploadMissionPayload};
use crate::bus::{EventPublisher, MISSION_UPLOAD_FAILED_EVENT, MISSION_UPLOAD_SUCCESS_EVENT};
use crate::config::Config;
use crate::error::{FcmError, Result};
use crate::fcc::{FccError, FccResult, FlightController};
use crate::mission::{FencePoint, MissionBuilder, MissionItem, Polygon};
use crate::state::{PositionTracker, TargetSlot};

/// Handlers for every vehicle action
pub struct ActionHandlers {
    pub(super) fcc: Arc<dyn FlightController>,
    pub(super) tracker: Arc<PositionTracker>,
    pub(super) target: Arc<TargetSlot>,
    pub(super) events: EventPublisher,
    builder: MissionBuilder,
    break_duration: Duration,
}

impl std::fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandlers")
            .field("builder", &self.builder)
            .field("break_duration", &self.break_duration)
            .finish_non_exhaustive()
    }
}

/// Build the inclusive rectangle spanned by the payload's corners
///
/// PX4 does not infer a rectangle from two opposite corners, so all four
/// are listed: top-left, top-right, bottom-left, bottom-right.
pub fn rectangle_fence(bounds: &GeofencePayload) -> Polygon {
    Polygon {
        points: vec![
            FencePoint::new(bounds.max_lat, bounds.min_lon),
            FencePoint::new(bounds.max_lat, bounds.max_lon),
            FencePoint::new(bounds.min_lat, bounds.min_lon),
            FencePoint::new(bounds.min_lat, bounds.max_lon),
        ],
    }
}

/// Reason string reported in `mission_upload_failed_event`
fn rejection_reason(err: &FccError) -> String {
    match err {
        FccError::Mission { reason } | FccError::Geofence { reason } => reason.clone(),
        FccError::Action { result, .. } => result.to_string(),
        FccError::Telemetry(message) => message.clone(),
    }
}

impl ActionHandlers {
    pub fn new(
        config: &Config,
        fcc: Arc<dyn FlightController>,
        tracker: Arc<PositionTracker>,
        target: Arc<TargetSlot>,
        events: EventPublisher,
    ) -> Self {
        Self {
            fcc,
            tracker,
            target,
            events,
            builder: MissionBuilder::new(&config.mission),
            break_duration: Duration::from_millis(config.actions.break_duration_ms),
        }
    }

    /// Run the handler for `action`
    pub async fn execute(self: Arc<Self>, action: Action) -> Result<()> {
        match action {
            Action::Break => self.intentional_timeout().await,
            Action::Connect => self.connect().await,
            Action::Arm => self.arm().await,
            Action::Disarm => self.disarm().await,
            Action::Kill => self.kill().await,
            Action::Land => self.land().await,
            Action::Reboot => self.reboot().await,
            Action::Takeoff(p) => self.takeoff(p.alt).await,
            Action::GotoLocation(p) => self.goto_location(&p).await,
            Action::GotoLocationNed(p) => self.goto_location_ned(&p).await,
            Action::UploadMission(p) => self.build_and_upload(&p).await,
            Action::StartMission => self.start_mission().await,
            Action::SetGeofence(p) => self.set_geofence(&p).await,
        }
    }

    /// Shared executor for primitives with success/failed events
    async fn run_simple<F>(&self, action: &str, call: F) -> Result<()>
    where
        F: Future<Output = FccResult<()>>,
    {
        match call.await {
            Ok(()) => {
                let event = format!("{}_success_event", action);
                info!("Sending {}", event);
                self.events.publish(event);
                Ok(())
            }
            Err(e) => {
                let event = format!("{}_failed_event", action);
                info!("Sending {} ({})", event, e);
                self.events.publish(event);

                if e.is_connection_lost() {
                    warn!("FCC link lost, reconnecting");
                    let fcc = self.fcc.clone();
                    tokio::spawn(async move {
                        if let Err(e) = fcc.connect().await {
                            error!("Reconnect failed: {}", e);
                        }
                    });
                }

                Err(e.into())
            }
        }
    }

    /// Sleep past any sane deadline without touching the vehicle
    pub async fn intentional_timeout(&self) -> Result<()> {
        info!("Sleeping {:?} to exercise the dispatcher timeout", self.break_duration);
        tokio::time::sleep(self.break_duration).await;
        Ok(())
    }

    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to the FCC");
        self.fcc.connect().await?;
        info!("Connected to the FCC");
        Ok(())
    }

    pub async fn arm(&self) -> Result<()> {
        info!("Sending arm command");
        self.run_simple("arm", self.fcc.arm()).await
    }

    pub async fn disarm(&self) -> Result<()> {
        info!("Sending disarm command");
        self.run_simple("disarm", self.fcc.disarm()).await
    }

    /// Cut the motors, in the air or not
    pub async fn kill(&self) -> Result<()> {
        warn!("Sending kill command");
        self.run_simple("kill", self.fcc.kill()).await
    }

    pub async fn land(&self) -> Result<()> {
        info!("Sending land command");
        self.run_simple("land", self.fcc.land()).await
    }

    pub async fn reboot(&self) -> Result<()> {
        warn!("Sending reboot command");
        self.run_simple("reboot", self.fcc.reboot()).await
    }

    /// Set the takeoff altitude, arm, then take off
    pub async fn takeoff(&self, altitude_m: f32) -> Result<()> {
        info!("Setting takeoff altitude to {}", altitude_m);
        self.fcc.set_takeoff_altitude(altitude_m).await?;
        self.arm().await?;
        info!("Sending takeoff command");
        self.run_simple("takeoff", self.fcc.takeoff()).await
    }

    /// Upload an inclusive rectangular geofence
    ///
    /// Empty or inverted bounds are reported like a controller rejection
    /// and never reach the vehicle.
    pub async fn set_geofence(&self, bounds: &GeofencePayload) -> Result<()> {
        if bounds.min_lat >= bounds.max_lat || bounds.min_lon >= bounds.max_lon {
            error!("Refusing geofence with empty or inverted bounds: {:?}", bounds);
            self.events.publish_with(
                MISSION_UPLOAD_FAILED_EVENT,
                "geofence minimum must be below maximum",
            );
            return Ok(());
        }

        info!(
            "Uploading geofence of ({}, {}), ({}, {})",
            bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon
        );

        if let Err(e) = self.fcc.upload_geofence(vec![rectangle_fence(bounds)]).await {
            warn!("Geofence upload failed because: {}", e);
            self.events.publish_with(MISSION_UPLOAD_FAILED_EVENT, rejection_reason(&e));
        }
        Ok(())
    }

    /// Build mission items from waypoints
    ///
    /// Samples one raw GPS fix when the first waypoint has no position.
    pub async fn build(&self, waypoints: &[crate::mission::Waypoint]) -> Result<Vec<MissionItem>> {
        let home = self.tracker.home().ok_or_else(|| {
            FcmError::Precondition("home position has not been captured".to_string())
        })?;

        let first_fix = match waypoints.first() {
            Some(first) if first.needs_fix() => Some(self.fcc.raw_position().await?),
            _ => None,
        };

        self.builder.build(waypoints, &home, first_fix)
    }

    /// Replace the vehicle's mission with `items`
    pub async fn upload(&self, items: Vec<MissionItem>) -> Result<()> {
        let result = async {
            info!("Clearing existing mission on the drone");
            self.fcc.clear_mission().await?;
            info!("Uploading {} mission items to drone", items.len());
            self.fcc.upload_mission(items).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Mission upload SUCCESS");
                self.events.publish(MISSION_UPLOAD_SUCCESS_EVENT);
            }
            Err(e) => {
                warn!("Mission upload failed because: {}", e);
                self.events.publish_with(MISSION_UPLOAD_FAILED_EVENT, rejection_reason(&e));
            }
        }
        Ok(())
    }

    /// Build and upload in one step
    pub async fn build_and_upload(&self, payload: &UploadMissionPayload) -> Result<()> {
        let items = match self.build(&payload.waypoints).await {
            Ok(items) => items,
            Err(e) => {
                error!("Mission build failed: {}", e);
                self.events.publish_with(MISSION_UPLOAD_FAILED_EVENT, e.to_string());
                return Ok(());
            }
        };
        self.upload(items).await
    }

    /// Arm, then start the uploaded mission
    ///
    /// No dedicated failure event; errors reach the dispatcher.
    pub async fn start_mission(&self) -> Result<()> {
        self.arm().await?;
        info!("Sending start mission command");
        self.fcc.start_mission().await?;
        Ok(())
    }
}
