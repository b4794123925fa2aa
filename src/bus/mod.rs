//! # Message Bus Module
//!
//! Boundary to the publish/subscribe transport.
//!
//! This module handles:
//! - Outbound events and the fire-and-forget [`EventPublisher`]
//! - The inbound [`BusMessage`] envelope
//! - Routing inbound topics to the action queue and position tracker
//! - A line-delimited JSON transport over stdin/stdout
//!
//! The broker itself (MQTT or otherwise) is external; it is expected to
//! deliver each topic in publish order.

pub mod router;
pub mod stdio;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

pub use router::TopicRouter;

/// Event published when the dispatcher rejects an action
pub const FCC_BUSY_EVENT: &str = "fcc_busy_event";
/// Event published when an action exceeds the dispatcher deadline
pub const ACTION_TIMEOUT_EVENT: &str = "action_timeout_event";
/// Event published once a goto command has been issued
pub const GO_TO_STARTED_EVENT: &str = "go_to_started_event";
/// Event published when the vehicle reaches the goto target
pub const GOTO_COMPLETE_EVENT: &str = "goto_complete_event";
pub const MISSION_UPLOAD_SUCCESS_EVENT: &str = "mission_upload_success_event";
pub const MISSION_UPLOAD_FAILED_EVENT: &str = "mission_upload_failed_event";

/// An inbound or outbound message on some topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl BusMessage {
    pub fn new(topic: &str, payload: Value) -> Self {
        Self { topic: topic.to_string(), payload }
    }
}

/// An outbound state-machine event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Cloneable handle for publishing events
///
/// Publishing never blocks and never fails; if the transport side has gone
/// away the event is dropped.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventPublisher {
    /// Create a publisher and the receiver the transport drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event without payload
    pub fn publish(&self, name: impl Into<String>) {
        self.send(Event::new(name, None));
    }

    /// Publish an event with a payload
    pub fn publish_with(&self, name: impl Into<String>, payload: impl Into<Value>) {
        self.send(Event::new(name, Some(payload.into())));
    }

    fn send(&self, event: Event) {
        debug!("Publishing {}", event.name);
        if let Err(e) = self.tx.send(event) {
            debug!("Event {} dropped, no subscriber: {}", e.0.name, e);
        }
    }
}
