//! # Control Module
//!
//! Wires the position tracker, goto target, dispatcher, and handlers together
//! and runs the action queue alongside the goto monitor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::actions::{run_action_queue, ActionHandlers, ActionRequest, Dispatcher, GotoMonitor};
use crate::bus::{EventPublisher, TopicRouter};
use crate::config::Config;
use crate::error::Result;
use crate::fcc::FlightController;
use crate::state::{PositionTracker, TargetSlot};

/// Command-and-control layer for one vehicle
pub struct ControlModule {
    config: Config,
    fcc: Arc<dyn FlightController>,
    tracker: Arc<PositionTracker>,
    target: Arc<TargetSlot>,
    events: EventPublisher,
    dispatcher: Dispatcher,
    handlers: Arc<ActionHandlers>,
    requests_tx: mpsc::UnboundedSender<ActionRequest>,
    requests_rx: mpsc::UnboundedReceiver<ActionRequest>,
}

impl ControlModule {
    pub fn new(config: &Config, fcc: Arc<dyn FlightController>, events: EventPublisher) -> Self {
        let tracker = Arc::new(PositionTracker::new());
        let target = Arc::new(TargetSlot::new());
        let dispatcher = Dispatcher::new(
            Duration::from_millis(config.dispatcher.timeout_ms),
            events.clone(),
        );
        let handlers = Arc::new(ActionHandlers::new(
            config,
            fcc.clone(),
            tracker.clone(),
            target.clone(),
            events.clone(),
        ));
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();

        Self {
            config: config.clone(),
            fcc,
            tracker,
            target,
            events,
            dispatcher,
            handlers,
            requests_tx,
            requests_rx,
        }
    }

    /// Router feeding this module from the configured bus topics
    pub fn router(&self) -> TopicRouter {
        TopicRouter::new(self.config.bus.clone(), self.tracker.clone(), self.requests_tx.clone())
    }

    /// Connect, then run the queue loop and goto monitor until `shutdown`
    ///
    /// Both loops stop together. The queue loop also ends once every
    /// [`TopicRouter`] handed out by [`router`](Self::router) is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial connection fails.
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let Self {
            config,
            fcc,
            tracker,
            target,
            events,
            dispatcher,
            handlers,
            requests_tx,
            requests_rx,
        } = self;
        drop(requests_tx);

        info!("Connecting to FCC at {} (system id {})", config.fcc.address, config.fcc.system_id);
        fcc.connect().await?;
        info!("Connected to FCC");

        let monitor = GotoMonitor::new(&config.monitor, tracker, target, events.clone());
        let queue = run_action_queue(requests_rx, dispatcher, handlers, events);

        tokio::select! {
            _ = queue => info!("Action queue finished"),
            _ = monitor.run() => {}
            _ = shutdown => info!("Shutting down control module"),
        }

        Ok(())
    }
}
