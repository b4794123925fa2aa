//! # Action Dispatcher
//!
//! Runs at most one action at a time under a deadline.
//!
//! ## Lifecycle
//!
//! 1. [`Dispatcher::schedule`] checks the slot. If an action is still running
//!    the call fails immediately with `DispatcherBusy`; nothing is queued.
//! 2. Otherwise the action is spawned and recorded in the slot.
//! 3. On completion `request_<name>_completed_event` is published.
//! 4. On deadline expiry the action future is dropped, which cancels any
//!    in-flight controller call at its next suspension point, and
//!    `action_timeout_event` is published with the action name.
//! 5. Errors returned by the action are logged and absorbed.
//!
//! In every case the slot is freed before the terminal event goes out.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::bus::{EventPublisher, ACTION_TIMEOUT_EVENT};
use crate::error::{FcmError, Result};

/// Deadline applied when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The single in-flight action
#[derive(Debug)]
struct DispatchSlot {
    id: u64,
    name: String,
    deadline: Instant,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct SlotState {
    active: Option<DispatchSlot>,
    next_id: u64,
}

/// Single-flight action runner
#[derive(Debug, Clone)]
pub struct Dispatcher {
    slot: Arc<Mutex<SlotState>>,
    timeout: Duration,
    events: EventPublisher,
}

/// Event name published when an action completes
pub fn completed_event(name: &str) -> String {
    format!("request_{}_completed_event", name)
}

fn lock(slot: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Free the slot if it still belongs to action `id`
fn release(slot: &Mutex<SlotState>, id: u64) {
    let mut state = lock(slot);
    if state.active.as_ref().is_some_and(|s| s.id == id) {
        state.active = None;
    }
}

impl Dispatcher {
    pub fn new(timeout: Duration, events: EventPublisher) -> Self {
        Self {
            slot: Arc::new(Mutex::new(SlotState::default())),
            timeout,
            events,
        }
    }

    /// Start `task` unless another action is running
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DispatcherBusy` if an action is already in flight; the
    /// running action is unaffected.
    pub fn schedule<F>(&self, name: &str, task: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        debug!("Scheduling a task for '{}'", name);

        // Check and claim under one lock so two callers cannot both win
        let mut state = lock(&self.slot);
        if let Some(active) = state.active.as_ref() {
            if !active.handle.is_finished() {
                return Err(FcmError::DispatcherBusy {
                    active: active.name.clone(),
                    rejected: name.to_string(),
                });
            }
        }

        let id = state.next_id;
        state.next_id += 1;

        let handle = tokio::spawn(Self::run(
            self.slot.clone(),
            id,
            name.to_string(),
            self.timeout,
            self.events.clone(),
            task,
        ));

        state.active = Some(DispatchSlot {
            id,
            name: name.to_string(),
            deadline: Instant::now() + self.timeout,
            handle,
        });
        Ok(())
    }

    async fn run<F>(
        slot: Arc<Mutex<SlotState>>,
        id: u64,
        name: String,
        limit: Duration,
        events: EventPublisher,
        task: F,
    ) where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let outcome = timeout(limit, task).await;
        release(&slot, id);

        match outcome {
            Ok(Ok(())) => {
                info!("Action '{}' completed", name);
                events.publish(completed_event(&name));
            }
            Ok(Err(e)) => {
                error!("Action '{}' failed: {}", name, e);
            }
            Err(_) => {
                warn!("Action '{}' timed out after {:?}", name, limit);
                events.publish_with(ACTION_TIMEOUT_EVENT, name);
            }
        }
    }

    /// True while an action is in flight
    pub fn is_busy(&self) -> bool {
        lock(&self.slot)
            .active
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Name of the in-flight action, if any
    pub fn active(&self) -> Option<String> {
        lock(&self.slot)
            .active
            .as_ref()
            .filter(|s| !s.handle.is_finished())
            .map(|s| s.name.clone())
    }

    /// Time left before the in-flight action is abandoned
    pub fn remaining(&self) -> Option<Duration> {
        lock(&self.slot)
            .active
            .as_ref()
            .filter(|s| !s.handle.is_finished())
            .map(|s| s.deadline.saturating_duration_since(Instant::now()))
    }
}
