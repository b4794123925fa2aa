//! # Vehicle State Module
//!
//! Shared, lock-protected state mutated by telemetry and goto handlers.
//!
//! This module handles:
//! - Tracking the latest current and home positions
//! - Forcing home recapture on request
//! - Holding the active goto target and clearing it atomically on arrival

pub mod position;
pub mod target;

pub use position::{CurrentPositionSample, HomePositionSample, PositionTracker};
pub use target::{Target, TargetSlot};
