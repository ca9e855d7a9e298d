//! Hysteresis control over one telemetry channel.
//!
//! The policy remembers which regime it last commanded and only emits a
//! command pair when a reading falls on the other side of the threshold:
//!
//! ```text
//!   value >= threshold, regime != High  ──▶ send high pair, regime = High
//!   value <  threshold, regime != Low   ──▶ send low pair,  regime = Low
//!   anything else                       ──▶ nothing
//! ```
//!
//! Each pair is two independent set-value commands, frequency first, then
//! amplitude, sent back to back.

use log::debug;

use crate::app::ports::CommandPort;
use crate::command::{CommandMessage, Property};
use crate::config::{ControlConfig, Setpoint};

/// Last commanded regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Nothing commanded yet; the device runs its power-on default.
    Unset,
    High,
    Low,
}

pub struct ControlPolicy {
    config: ControlConfig,
    regime: Regime,
}

impl ControlPolicy {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            regime: Regime::Unset,
        }
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Frequency marker of the current regime (initial marker when unset).
    pub fn marker(&self) -> u16 {
        match self.regime {
            Regime::Unset => self.config.initial_marker,
            Regime::High => self.config.high.frequency,
            Regime::Low => self.config.low.frequency,
        }
    }

    /// React to one decoded reading of the source channel.
    ///
    /// Returns the new regime when a command pair was sent. Leading
    /// whitespace is skipped; text with anything after the number is ignored.
    pub fn on_reading(&mut self, text: &str, port: &mut impl CommandPort) -> Option<Regime> {
        let Ok(value) = text.trim_start().parse::<f32>() else {
            debug!("control: '{}' is not a number, no reaction", text);
            return None;
        };
        debug!("control: marker={} value={:.6}", self.marker(), value);

        let threshold = self.config.threshold;
        let next = if value >= threshold && self.regime != Regime::High {
            Regime::High
        } else if value < threshold && self.regime != Regime::Low {
            Regime::Low
        } else {
            return None;
        };

        let setpoint = match next {
            Regime::High => self.config.high,
            _ => self.config.low,
        };
        self.send_pair(setpoint, port);
        debug!("control: {:?} -> {:?} ({:?})", self.regime, next, setpoint);
        self.regime = next;
        Some(next)
    }

    fn send_pair(&self, setpoint: Setpoint, port: &mut impl CommandPort) {
        let target = self.config.target_channel;
        let frequency = CommandMessage::set(target, Property::Frequency, setpoint.frequency);
        let amplitude = CommandMessage::set(target, Property::Amplitude, setpoint.amplitude);
        port.send(&frequency.encode());
        port.send(&amplitude.encode());
    }
}
