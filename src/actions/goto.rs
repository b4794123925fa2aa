//! # Goto Handlers and Arrival Monitor
//!
//! Goto commands record a target; [`GotoMonitor`] watches the current position
//! and publishes `goto_complete_event` exactly once when the vehicle arrives.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::{ActionHandlers, GotoLocationNedPayload, GotoLocationPayload};
use crate::bus::{EventPublisher, GOTO_COMPLETE_EVENT, GO_TO_STARTED_EVENT};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::geo::{ned_to_geodetic, Geodetic, Ned};
use crate::state::{PositionTracker, TargetSlot};

impl ActionHandlers {
    /// Fly to an absolute position (altitude AMSL)
    pub async fn goto_location(&self, p: &GotoLocationPayload) -> Result<()> {
        info!("Sending goto ({}, {}, {}) heading {}", p.lat, p.lon, p.alt, p.heading);
        self.fcc
            .goto_location(p.lat, p.lon, p.alt as f32, p.heading)
            .await?;

        self.target.set(Geodetic::new(p.lat, p.lon, p.alt));
        self.events.publish(GO_TO_STARTED_EVENT);
        Ok(())
    }

    /// Fly to an NED offset from home, or from the current position
    ///
    /// Without both home and current position fixes the request is logged
    /// and dropped. The recorded target altitude is `-d`, relative to home,
    /// matching the relative altitude reported by position telemetry.
    pub async fn goto_location_ned(&self, p: &GotoLocationNedPayload) -> Result<()> {
        let (home, current) = self.tracker.snapshot();
        let (Some(home), Some(current)) = (home, current) else {
            error!("Cannot goto NED offset: home or current position not yet known");
            return Ok(());
        };

        let reference = if p.relative {
            Geodetic::new(current.lat, current.lon, current.alt + home.alt)
        } else {
            home
        };
        let point = ned_to_geodetic(&Ned::new(p.n, p.e, p.d), &reference);

        info!(
            "Sending goto NED ({}, {}, {}) -> ({}, {}, {})",
            p.n, p.e, p.d, point.lat, point.lon, point.alt
        );
        self.fcc
            .goto_location(point.lat, point.lon, point.alt as f32, p.heading)
            .await?;

        self.target.set(Geodetic::new(point.lat, point.lon, -p.d));
        self.events.publish(GO_TO_STARTED_EVENT);
        Ok(())
    }
}

/// Periodic arrival check for the active goto target
#[derive(Debug)]
pub struct GotoMonitor {
    tracker: Arc<PositionTracker>,
    target: Arc<TargetSlot>,
    events: EventPublisher,
    tick: Duration,
    arrival_radius_m: f64,
}

impl GotoMonitor {
    pub fn new(
        config: &MonitorConfig,
        tracker: Arc<PositionTracker>,
        target: Arc<TargetSlot>,
        events: EventPublisher,
    ) -> Self {
        Self {
            tracker,
            target,
            events,
            tick: Duration::from_millis(config.tick_ms),
            arrival_radius_m: config.arrival_radius_m,
        }
    }

    /// Run one arrival check, returning true if the target was reached
    pub fn check(&self) -> bool {
        let Some(current) = self.tracker.current() else {
            return false;
        };

        match self.target.take_if_reached(&current, self.arrival_radius_m) {
            Some(target) => {
                info!("Reached goto target ({}, {}, {})", target.lat, target.lon, target.alt);
                self.events.publish(GOTO_COMPLETE_EVENT);
                true
            }
            None => false,
        }
    }

    /// Check on every tick, forever
    pub async fn run(&self) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Goto monitor ticking every {:?}", self.tick);

        loop {
            ticker.tick().await;
            self.check();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::dispatcher::DEFAULT_TIMEOUT;
    use crate::actions::handlers::tests::{drain, handlers, LogCapture};
    use crate::actions::queue::submit;
    use crate::actions::{ActionRequest, Dispatcher};
    use serde_json::json;
    use crate::fcc::{ActionResult, FccError, MockFlightController};
    use crate::geo::distance;
    use crate::state::{CurrentPositionSample, HomePositionSample};
    use std::sync::Mutex;

    fn monitor() -> (GotoMonitor, Arc<PositionTracker>, Arc<TargetSlot>, tokio::sync::mpsc::UnboundedReceiver<crate::bus::Event>) {
        let (events, rx) = EventPublisher::channel();
        let tracker = Arc::new(PositionTracker::new());
        let target = Arc::new(TargetSlot::new());
        let monitor = GotoMonitor::new(&MonitorConfig::default(), tracker.clone(), target.clone(), events);
        (monitor, tracker, target, rx)
    }

    fn feed_current(tracker: &PositionTracker, lat: f64, lon: f64, rel_alt: f64) {
        tracker.update_current(&CurrentPositionSample { lat: Some(lat), lon: Some(lon), rel_alt: Some(rel_alt) });
    }

    fn feed_home(tracker: &PositionTracker, lat: f64, lon: f64, abs_alt: f64) {
        tracker.update_home(&HomePositionSample { lat: Some(lat), lon: Some(lon), abs_alt: Some(abs_alt) });
    }

    #[test]
    fn test_exact_arrival_fires_once() {
        let (monitor, tracker, target, mut rx) = monitor();
        feed_current(&tracker, 40.0, -74.0, 2.0);
        target.set(Geodetic::new(40.0, -74.0, 2.0));

        assert!(monitor.check());
        assert!(!monitor.check());
        assert!(!target.is_active());
        assert_eq!(drain(&mut rx), vec![GOTO_COMPLETE_EVENT]);
    }

    #[test]
    fn test_far_target_stays_active() {
        let (monitor, tracker, target, mut rx) = monitor();
        feed_current(&tracker, 40.0, -74.0, 2.0);
        target.set(Geodetic::new(40.001, -74.0, 2.0));

        assert!(!monitor.check());
        assert!(target.is_active());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_no_position_no_check() {
        let (monitor, _tracker, target, mut rx) = monitor();
        target.set(Geodetic::new(40.0, -74.0, 2.0));
        assert!(!monitor.check());
        assert!(target.is_active());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_detects_arrival_on_tick() {
        let (monitor, tracker, target, mut rx) = monitor();
        target.set(Geodetic::new(40.0, -74.0, 2.0));
        feed_current(&tracker, 40.0, -74.0, 2.0);

        let task = tokio::spawn(async move { monitor.run().await });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, GOTO_COMPLETE_EVENT);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        task.abort();
    }

    #[tokio::test]
    async fn test_goto_location_sets_target_and_announces() {
        let mut fcc = MockFlightController::new();
        fcc.expect_goto_location()
            .withf(|lat, lon, alt, yaw| *lat == 40.0 && *lon == -74.0 && *alt == 15.0 && *yaw == 90.0)
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let (handlers, mut rx) = handlers(fcc);

        handlers
            .goto_location(&GotoLocationPayload { lat: 40.0, lon: -74.0, alt: 15.0, heading: 90.0 })
            .await
            .unwrap();

        assert_eq!(handlers.target.get(), Some(Geodetic::new(40.0, -74.0, 15.0)));
        assert_eq!(drain(&mut rx), vec![GO_TO_STARTED_EVENT]);
    }

    #[tokio::test]
    async fn test_goto_location_rejected_leaves_target_empty() {
        let mut fcc = MockFlightController::new();
        fcc.expect_goto_location()
            .returning(|_, _, _, _| Err(FccError::action(ActionResult::CommandDenied, "not armed")));
        let (handlers, mut rx) = handlers(fcc);

        let payload = GotoLocationPayload { lat: 40.0, lon: -74.0, alt: 15.0, heading: 0.0 };
        assert!(handlers.goto_location(&payload).await.is_err());
        assert!(!handlers.target.is_active());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_goto_ned_without_current_position_is_dropped() {
        let mut fcc = MockFlightController::new();
        fcc.expect_goto_location().never();
        let (handlers, mut rx) = handlers(fcc);
        feed_home(&handlers.tracker, 40.0, -74.0, 10.0);

        let (logs, _guard) = LogCapture::install(tracing::Level::ERROR);
        let payload = GotoLocationNedPayload { n: 1.0, e: 1.0, d: -2.0, heading: 0.0, relative: true };
        handlers.goto_location_ned(&payload).await.unwrap();

        assert!(!handlers.target.is_active());
        assert!(drain(&mut rx).is_empty());
        let errors = logs.lines();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("ERROR"));
        assert!(errors[0].contains("home or current position not yet known"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_goto_ned_without_current_position_completes_through_dispatcher() {
        let mut fcc = MockFlightController::new();
        fcc.expect_goto_location().never();
        let (handlers, mut rx) = handlers(fcc);
        feed_home(&handlers.tracker, 40.0, -74.0, 10.0);
        let dispatcher = Dispatcher::new(DEFAULT_TIMEOUT, handlers.events.clone());

        let (logs, _guard) = LogCapture::install(tracing::Level::ERROR);
        submit(
            ActionRequest::new("goto_location_ned", json!({"n": 1, "e": 1, "d": -2, "rel": true})),
            &dispatcher,
            &handlers,
            &handlers.events,
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "request_goto_location_ned_completed_event");
        assert!(!dispatcher.is_busy());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(logs.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_goto_ned_from_home() {
        let sent = Arc::new(Mutex::new(None));
        let mut fcc = MockFlightController::new();
        let s = sent.clone();
        fcc.expect_goto_location().times(1).returning(move |lat, lon, alt, _| {
            *s.lock().unwrap() = Some((lat, lon, alt));
            Ok(())
        });
        let (handlers, mut rx) = handlers(fcc);
        let home = Geodetic::new(40.0, -74.0, 10.0);
        feed_home(&handlers.tracker, home.lat, home.lon, home.alt);
        feed_current(&handlers.tracker, 40.5, -74.5, 7.0);

        let payload = GotoLocationNedPayload { n: 10.0, e: 0.0, d: -5.0, heading: 0.0, relative: false };
        handlers.goto_location_ned(&payload).await.unwrap();

        let (lat, lon, alt) = sent.lock().unwrap().unwrap();
        let commanded = Geodetic::new(lat, lon, f64::from(alt));
        assert!(lat > home.lat);
        assert!((f64::from(alt) - 15.0).abs() < 0.01);
        assert!((distance(&commanded, &home) - (10.0f64.powi(2) + 5.0f64.powi(2)).sqrt()).abs() < 0.05);

        let target = handlers.target.get().unwrap();
        assert_eq!(target.alt, 5.0);
        assert_eq!(target.lat, lat);
        assert_eq!(drain(&mut rx), vec![GO_TO_STARTED_EVENT]);
    }

    #[tokio::test]
    async fn test_goto_ned_relative_to_current() {
        let sent = Arc::new(Mutex::new(None));
        let mut fcc = MockFlightController::new();
        let s = sent.clone();
        fcc.expect_goto_location().times(1).returning(move |lat, lon, alt, _| {
            *s.lock().unwrap() = Some((lat, lon, alt));
            Ok(())
        });
        let (handlers, _rx) = handlers(fcc);
        feed_home(&handlers.tracker, 40.0, -74.0, 10.0);
        feed_current(&handlers.tracker, 40.01, -74.0, 3.0);

        let payload = GotoLocationNedPayload { n: 0.0, e: 0.0, d: -2.0, heading: 0.0, relative: true };
        handlers.goto_location_ned(&payload).await.unwrap();

        let (lat, lon, alt) = sent.lock().unwrap().unwrap();
        assert!((lat - 40.01).abs() < 1e-7);
        assert!((lon + 74.0).abs() < 1e-7);
        // Current relative altitude plus home AMSL, then two metres up
        assert!((f64::from(alt) - 15.0).abs() < 0.01);
        assert_eq!(handlers.target.get().unwrap().alt, 2.0);
    }
}
