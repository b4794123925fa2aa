//! # Position Tracker
//!
//! Holds the latest known current and home positions. Each becomes
//! initialized on its first sample carrying a latitude.
//!
//! Current position is overwritten by every sample. Home position is
//! captured once and then held until [`PositionTracker::request_home_capture`]
//! is called, after which the next home sample is captured again.

use serde::Deserialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::geo::Geodetic;

/// Current global position telemetry. Altitude is relative to home.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct CurrentPositionSample {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub rel_alt: Option<f64>,
}

/// Home global position telemetry. Altitude is above mean sea level.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct HomePositionSample {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub abs_alt: Option<f64>,
}

#[derive(Debug, Default)]
struct Positions {
    current: Option<Geodetic>,
    home: Option<Geodetic>,
}

/// Latest current and home positions
#[derive(Debug, Default)]
pub struct PositionTracker {
    inner: Mutex<Positions>,
}

/// Build a point from a sample, `None` when the sample carries no fix
fn sample_point(lat: Option<f64>, lon: Option<f64>, alt: Option<f64>) -> Option<Geodetic> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Geodetic::new(lat, lon, alt.unwrap_or(0.0))),
        _ => None,
    }
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Positions> {
        // State stays consistent even if a holder panicked: every update is a single assignment
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a current-position sample
    pub fn update_current(&self, sample: &CurrentPositionSample) {
        let Some(point) = sample_point(sample.lat, sample.lon, sample.rel_alt) else {
            debug!("Ignoring current position sample without a fix");
            return;
        };

        let mut state = self.lock();
        if state.current.is_none() {
            info!("Current position initialized");
        }
        state.current = Some(point);
    }

    /// Apply a home-position sample; ignored once home has been captured
    pub fn update_home(&self, sample: &HomePositionSample) {
        let mut state = self.lock();
        if state.home.is_some() {
            return;
        }

        if let Some(point) = sample_point(sample.lat, sample.lon, sample.abs_alt) {
            info!(
                "Home position captured at ({:.7}, {:.7}, {:.2} m AMSL)",
                point.lat, point.lon, point.alt
            );
            state.home = Some(point);
        }
    }

    /// Drop the captured home so the next home sample is captured again
    pub fn request_home_capture(&self) {
        info!("Home position recapture requested");
        self.lock().home = None;
    }

    /// Latest current position; altitude is relative to home
    pub fn current(&self) -> Option<Geodetic> {
        self.lock().current
    }

    /// Captured home position; altitude is AMSL
    pub fn home(&self) -> Option<Geodetic> {
        self.lock().home
    }

    /// Home and current together, read under one lock
    pub fn snapshot(&self) -> (Option<Geodetic>, Option<Geodetic>) {
        let state = self.lock();
        (state.home, state.current)
    }
}
