//! Client configuration parameters
//!
//! All tunable parameters for the rig client. Defaults reproduce the rig's
//! reference sizing; any of them can be overridden from a JSON file or the
//! command line.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{self, ConfigError, SetupError};
use crate::telemetry::Channel;

/// Core client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub ports: PortConfig,
    pub control: ControlConfig,

    // --- Timing ---
    /// Periodic snapshot tick (milliseconds)
    pub tick_interval_ms: u64,
    /// Upper bound on one multiplexed wait with no traffic (milliseconds)
    pub idle_timeout_ms: u64,
    /// Upper bound on each telemetry connect attempt (milliseconds)
    pub connect_timeout_ms: u64,

    // --- Liveness ---
    /// Silent ticks tolerated before the peer is declared lost
    pub liveness_threshold: u32,
}

/// Fixed port assignments on the rig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Connectionless command port
    pub command: u16,
    /// Telemetry stream ports, `out1`..`out3` in order
    pub telemetry: [u16; 3],
}

/// Hysteresis policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Telemetry channel whose value drives the policy
    pub source: Channel,
    /// Actuator channel the commands address
    pub target_channel: u16,
    /// Values at or above this select the high regime
    pub threshold: f32,
    /// Marker the peer device starts with before any command
    pub initial_marker: u16,
    pub high: Setpoint,
    pub low: Setpoint,
}

/// One frequency/amplitude pair sent as two back-to-back commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setpoint {
    pub frequency: u16,
    pub amplitude: u16,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub tick_interval_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            ports: PortConfig::default(),
            control: ControlConfig::default(),

            // Timing
            tick_interval_ms: 20,
            idle_timeout_ms: 10_000,
            connect_timeout_ms: 3_000,

            // Liveness
            liveness_threshold: 50,
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            command: 4000,
            telemetry: [4001, 4002, 4003],
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            source: Channel::Out3,
            target_channel: 1,
            threshold: 3.0,
            initial_marker: 500,
            high: Setpoint {
                frequency: 1000,
                amplitude: 8000,
            },
            low: Setpoint {
                frequency: 2000,
                amplitude: 4000,
            },
        }
    }
}

impl RigConfig {
    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject values that would make the loop spin, hang, or misroute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("idle_timeout_ms must be > 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("connect_timeout_ms must be > 0"));
        }
        if self.liveness_threshold == 0 {
            return Err(ConfigError::ValidationFailed("liveness_threshold must be > 0"));
        }

        let ports = &self.ports;
        if ports.command == 0 || ports.telemetry.contains(&0) {
            return Err(ConfigError::ValidationFailed("ports must be non-zero"));
        }
        let [a, b, c] = ports.telemetry;
        if a == b || b == c || a == c {
            return Err(ConfigError::ValidationFailed("telemetry ports must be distinct"));
        }

        if !self.control.threshold.is_finite() {
            return Err(ConfigError::ValidationFailed("control.threshold must be finite"));
        }
        Ok(())
    }

    /// Start from `path` (or the defaults), apply `overrides`, then validate.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> error::Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path).map_err(SetupError::from)?,
            None => Self::default(),
        };
        if let Some(ms) = overrides.tick_interval_ms {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = overrides.idle_timeout_ms {
            config.idle_timeout_ms = ms;
        }
        config.validate().map_err(SetupError::from)?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
