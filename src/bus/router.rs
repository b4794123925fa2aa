//! # Topic Router
//!
//! Maps inbound topics onto the action queue and the position tracker.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::BusMessage;
use crate::actions::ActionRequest;
use crate::config::BusConfig;
use crate::state::{CurrentPositionSample, HomePositionSample, PositionTracker};

/// Dispatches inbound bus messages by topic
#[derive(Debug, Clone)]
pub struct TopicRouter {
    topics: BusConfig,
    tracker: Arc<PositionTracker>,
    actions: mpsc::UnboundedSender<ActionRequest>,
}

impl TopicRouter {
    pub fn new(
        topics: BusConfig,
        tracker: Arc<PositionTracker>,
        actions: mpsc::UnboundedSender<ActionRequest>,
    ) -> Self {
        Self { topics, tracker, actions }
    }

    /// Handle one inbound message
    ///
    /// Malformed payloads are logged and dropped.
    pub fn route(&self, message: BusMessage) {
        let BusMessage { topic, payload } = message;

        if topic == self.topics.action_topic {
            match serde_json::from_value::<ActionRequest>(payload) {
                Ok(request) => {
                    debug!("Queued action '{}'", request.action);
                    if self.actions.send(request).is_err() {
                        warn!("Action queue closed, dropping request");
                    }
                }
                Err(e) => warn!("Malformed action request: {}", e),
            }
        } else if topic == self.topics.global_position_topic {
            match serde_json::from_value::<CurrentPositionSample>(payload) {
                Ok(sample) => self.tracker.update_current(&sample),
                Err(e) => warn!("Malformed position telemetry: {}", e),
            }
        } else if topic == self.topics.home_position_topic {
            match serde_json::from_value::<HomePositionSample>(payload) {
                Ok(sample) => self.tracker.update_home(&sample),
                Err(e) => warn!("Malformed home telemetry: {}", e),
            }
        } else if topic == self.topics.capture_home_topic {
            self.tracker.request_home_capture();
        } else {
            debug!("Ignoring message on unhandled topic {}", topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Geodetic;
    use serde_json::json;

    fn router() -> (TopicRouter, Arc<PositionTracker>, mpsc::UnboundedReceiver<ActionRequest>) {
        let tracker = Arc::new(PositionTracker::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (TopicRouter::new(BusConfig::default(), tracker.clone(), tx), tracker, rx)
    }

    #[test]
    fn test_action_is_queued() {
        let (router, _, mut rx) = router();
        router.route(BusMessage::new("avr/fcm/actions", json!({"action": "arm", "payload": {}})));
        let request = rx.try_recv().unwrap();
        assert_eq!(request.action, "arm");
    }

    #[test]
    fn test_malformed_action_dropped() {
        let (router, _, mut rx) = router();
        router.route(BusMessage::new("avr/fcm/actions", json!({"payload": {}})));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_telemetry_updates_tracker() {
        let (router, tracker, _rx) = router();
        router.route(BusMessage::new(
            "avr/fcm/location/global_full",
            json!({"lat": 40.0, "lon": -74.0, "rel_alt": 2.0}),
        ));
        router.route(BusMessage::new(
            "avr/fcm/location/home_full",
            json!({"lat": 40.0, "lon": -74.0, "abs_alt": 10.0}),
        ));
        assert_eq!(tracker.current(), Some(Geodetic::new(40.0, -74.0, 2.0)));
        assert_eq!(tracker.home(), Some(Geodetic::new(40.0, -74.0, 10.0)));
    }

    #[test]
    fn test_capture_home_resets_home() {
        let (router, tracker, _rx) = router();
        router.route(BusMessage::new(
            "avr/fcm/location/home_full",
            json!({"lat": 40.0, "lon": -74.0, "abs_alt": 10.0}),
        ));
        router.route(BusMessage::new("avr/fcm/capture_home", json!({})));
        assert!(tracker.home().is_none());
    }

    #[test]
    fn test_malformed_telemetry_ignored() {
        let (router, tracker, _rx) = router();
        router.route(BusMessage::new("avr/fcm/location/global_full", json!({"lat": "north"})));
        assert!(tracker.current().is_none());
    }
}
