//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty file yields
//! [`Config::default`].

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{FcmError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub mission: MissionConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub fcc: FccConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Action dispatcher configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DispatcherConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Goto monitor configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_arrival_radius_m")]
    pub arrival_radius_m: f64,
}

/// Mission builder configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MissionConfig {
    #[serde(default = "default_zero_altitude_epsilon_m")]
    pub zero_altitude_epsilon_m: f64,

    #[serde(default = "default_takeoff_pitch_deg")]
    pub takeoff_pitch_deg: f32,
}

/// Action handler configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ActionsConfig {
    #[serde(default = "default_break_duration_ms")]
    pub break_duration_ms: u64,
}

/// Publish/subscribe topic names
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BusConfig {
    #[serde(default = "default_action_topic")]
    pub action_topic: String,

    #[serde(default = "default_capture_home_topic")]
    pub capture_home_topic: String,

    #[serde(default = "default_global_position_topic")]
    pub global_position_topic: String,

    #[serde(default = "default_home_position_topic")]
    pub home_position_topic: String,

    #[serde(default = "default_event_topic")]
    pub event_topic: String,
}

/// Flight controller link configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FccConfig {
    #[serde(default = "default_fcc_address")]
    pub address: String,

    #[serde(default = "default_system_id")]
    pub system_id: u8,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_timeout_ms() -> u64 { 10_000 }

fn default_tick_ms() -> u64 { 1000 }
fn default_arrival_radius_m() -> f64 { 0.5 }

fn default_zero_altitude_epsilon_m() -> f64 { 0.1 }
fn default_takeoff_pitch_deg() -> f32 { 5.0 }

fn default_break_duration_ms() -> u64 { 20_000 }

fn default_action_topic() -> String { "avr/fcm/actions".to_string() }
fn default_capture_home_topic() -> String { "avr/fcm/capture_home".to_string() }
fn default_global_position_topic() -> String { "avr/fcm/location/global_full".to_string() }
fn default_home_position_topic() -> String { "avr/fcm/location/home_full".to_string() }
fn default_event_topic() -> String { "avr/fcm/events".to_string() }

fn default_fcc_address() -> String { "tcp://127.0.0.1:5761".to_string() }
fn default_system_id() -> u8 { 141 }

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { timeout_ms: default_timeout_ms() }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            arrival_radius_m: default_arrival_radius_m(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            zero_altitude_epsilon_m: default_zero_altitude_epsilon_m(),
            takeoff_pitch_deg: default_takeoff_pitch_deg(),
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self { break_duration_ms: default_break_duration_ms() }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            action_topic: default_action_topic(),
            capture_home_topic: default_capture_home_topic(),
            global_position_topic: default_global_position_topic(),
            home_position_topic: default_home_position_topic(),
            event_topic: default_event_topic(),
        }
    }
}

impl Default for FccConfig {
    fn default() -> Self {
        Self {
            address: default_fcc_address(),
            system_id: default_system_id(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> FcmError {
    FcmError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fcm_control::config::Config;
    ///
    /// let config = Config::load("config/fcm.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.dispatcher.timeout_ms == 0 || self.dispatcher.timeout_ms > 600_000 {
            return Err(invalid("dispatcher timeout_ms must be between 1 and 600000"));
        }

        if self.monitor.tick_ms == 0 || self.monitor.tick_ms > 60_000 {
            return Err(invalid("monitor tick_ms must be between 1 and 60000"));
        }

        if !(self.monitor.arrival_radius_m > 0.0) {
            return Err(invalid("monitor arrival_radius_m must be greater than 0"));
        }

        if !(self.mission.zero_altitude_epsilon_m > 0.0) || self.mission.zero_altitude_epsilon_m > 1.0 {
            return Err(invalid("mission zero_altitude_epsilon_m must be in (0, 1]"));
        }

        if !(-90.0..=90.0).contains(&self.mission.takeoff_pitch_deg) {
            return Err(invalid("mission takeoff_pitch_deg must be between -90 and 90"));
        }

        if self.actions.break_duration_ms == 0 {
            return Err(invalid("actions break_duration_ms must be greater than 0"));
        }

        let topics = [
            ("action_topic", &self.bus.action_topic),
            ("capture_home_topic", &self.bus.capture_home_topic),
            ("global_position_topic", &self.bus.global_position_topic),
            ("home_position_topic", &self.bus.home_position_topic),
            ("event_topic", &self.bus.event_topic),
        ];
        for (i, (name, topic)) in topics.iter().enumerate() {
            if topic.is_empty() {
                return Err(invalid(format!("bus {} cannot be empty", name)));
            }
            if topics[..i].iter().any(|(_, other)| other == topic) {
                return Err(invalid(format!("bus {} duplicates another topic: {}", name, topic)));
            }
        }

        if self.fcc.address.is_empty() {
            return Err(invalid("fcc address cannot be empty"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }
}
