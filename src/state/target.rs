//! # Goto Target
//!
//! The active goto goal. Either fully present or absent; check-and-clear
//! happens under a single lock acquisition.

use std::sync::{Mutex, MutexGuard};

use crate::geo::{distance, Geodetic};

/// An active goto goal
pub type Target = Geodetic;

/// Lock-protected optional target
#[derive(Debug, Default)]
pub struct TargetSlot {
    inner: Mutex<Option<Target>>,
}

impl TargetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Target>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the active target
    pub fn set(&self, target: Target) {
        *self.lock() = Some(target);
    }

    pub fn get(&self) -> Option<Target> {
        *self.lock()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Take the target if `position` is strictly within `radius_m` of it
    ///
    /// Returns the cleared target. The distance check and the clear happen
    /// under the same lock, so a concurrent `set` is never lost.
    pub fn take_if_reached(&self, position: &Geodetic, radius_m: f64) -> Option<Target> {
        let mut slot = self.lock();
        match *slot {
            Some(target) if distance(&target, position) < radius_m => slot.take(),
            _ => None,
        }
    }
}
