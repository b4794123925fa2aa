//! # Action Queue Loop
//!
//! Drains inbound requests in arrival order and hands each to the dispatcher.
//! A request that arrives while another action is running is rejected with
//! `fcc_busy_event` and dropped.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{Action, ActionHandlers, ActionRequest, Dispatcher};
use crate::bus::{EventPublisher, FCC_BUSY_EVENT};
use crate::error::FcmError;

/// Decode and schedule one request
pub fn submit(
    request: ActionRequest,
    dispatcher: &Dispatcher,
    handlers: &Arc<ActionHandlers>,
    events: &EventPublisher,
) {
    let action = match Action::from_request(request) {
        Ok(action) => action,
        Err(FcmError::UnknownAction(name)) => {
            warn!("Unknown action: {}", name);
            return;
        }
        Err(e) => {
            warn!("Dropping action request: {}", e);
            return;
        }
    };

    let name = action.name();
    match dispatcher.schedule(name, handlers.clone().execute(action)) {
        Ok(()) => {}
        Err(FcmError::DispatcherBusy { active, rejected }) => {
            info!("Rejecting '{}' while '{}' is running", rejected, active);
            events.publish_with(FCC_BUSY_EVENT, rejected);
        }
        Err(e) => error!("Failed to schedule '{}': {}", name, e),
    }
}

/// Run until every request sender is dropped
pub async fn run_action_queue(
    mut requests: mpsc::UnboundedReceiver<ActionRequest>,
    dispatcher: Dispatcher,
    handlers: Arc<ActionHandlers>,
    events: EventPublisher,
) {
    info!("Action queue started");
    while let Some(request) = requests.recv().await {
        submit(request, &dispatcher, &handlers, &events);
    }
    info!("Action queue closed");
}
