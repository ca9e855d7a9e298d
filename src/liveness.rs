//! Liveness watchdog over the telemetry channels.
//!
//! Counts periodic ticks without any telemetry. Crossing the threshold is
//! read as loss of the peer and leads to a graceful shutdown, not an error:
//! restarting the client is left to whatever supervises the process.

pub struct LivenessMonitor {
    threshold: u32,
    silent_ticks: u32,
}

impl LivenessMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            silent_ticks: 0,
        }
    }

    /// One periodic tick has elapsed.
    pub fn on_tick(&mut self) {
        self.silent_ticks = self.silent_ticks.saturating_add(1);
    }

    /// A telemetry frame arrived on any channel.
    pub fn on_telemetry(&mut self) {
        self.silent_ticks = 0;
    }

    /// True once the silent tick count is strictly above the threshold.
    pub fn exceeded(&self) -> bool {
        self.silent_ticks > self.threshold
    }

    pub fn silent_ticks(&self) -> u32 {
        self.silent_ticks
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
