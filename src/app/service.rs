//! Rig service: the decision core of the monitor.
//!
//! [`RigService`] owns the channel snapshot, the control policy and the
//! liveness watchdog, plus the loop state that decides when to stop. It
//! performs no I/O of its own: the event loop hands it decoded signals and
//! raw telemetry bytes, and everything outbound flows through port traits
//! injected at call sites.
//!
//! ```text
//!  SignalEvent ──▶ ┌─────────────────────────────┐ ──▶ SnapshotSink
//!                  │         RigService          │
//!  telemetry   ──▶ │ snapshot · policy · liveness│ ──▶ CommandPort
//!                  └─────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::RigConfig;
use crate::control::{ControlPolicy, Regime};
use crate::error::RuntimeError;
use crate::liveness::LivenessMonitor;
use crate::signals::SignalEvent;
use crate::telemetry::{self, Channel, ChannelSnapshot};

use super::ports::{ClockPort, CommandPort, SnapshotSink};

// ───────────────────────────────────────────────────────────────
// Loop state
// ───────────────────────────────────────────────────────────────

/// Observable lifecycle of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// A stop was requested; no further events are handled.
    Stopping,
    Stopped,
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum Outcome {
    /// SIGINT or SIGTERM.
    Interrupted,
    /// The liveness watchdog fired.
    PeerSilent { silent_ticks: u32 },
    /// A signal the loop has no handler for reached the hand-off.
    UnknownSignal(i32),
    /// A fatal runtime error.
    Failed(RuntimeError),
}

impl Outcome {
    /// Orderly shutdowns exit with status 0.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Split off the failure case as an error.
    pub fn into_result(self) -> Result<Self, RuntimeError> {
        match self {
            Self::Failed(e) => Err(e),
            other => Ok(other),
        }
    }
}

enum Phase {
    Running,
    Stopping(Outcome),
    Stopped,
}

// ───────────────────────────────────────────────────────────────
// RigService
// ───────────────────────────────────────────────────────────────

pub struct RigService {
    snapshot: ChannelSnapshot,
    policy: ControlPolicy,
    liveness: LivenessMonitor,
    /// Channel whose readings drive the control policy.
    source: Channel,
    phase: Phase,
    ticks: u64,
    frames: u64,
}

impl RigService {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            snapshot: ChannelSnapshot::new(),
            policy: ControlPolicy::new(config.control.clone()),
            liveness: LivenessMonitor::new(config.liveness_threshold),
            source: config.control.source,
            phase: Phase::Running,
            ticks: 0,
            frames: 0,
        }
    }

    // ── Introspection ─────────────────────────────────────────

    pub fn state(&self) -> LoopState {
        match self.phase {
            Phase::Running => LoopState::Running,
            Phase::Stopping(_) => LoopState::Stopping,
            Phase::Stopped => LoopState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running)
    }

    pub fn snapshot(&self) -> &ChannelSnapshot {
        &self.snapshot
    }

    pub fn regime(&self) -> Regime {
        self.policy.regime()
    }

    pub fn silent_ticks(&self) -> u32 {
        self.liveness.silent_ticks()
    }

    /// Snapshot records emitted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Telemetry frames accepted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle one event read from the signal hand-off.
    pub fn handle_signal(
        &mut self,
        event: SignalEvent,
        clock: &impl ClockPort,
        sink: &mut impl SnapshotSink,
    ) {
        if !self.is_running() {
            return;
        }
        match event {
            SignalEvent::Interrupt => self.stop(Outcome::Interrupted),
            SignalEvent::Timer => self.on_tick(clock, sink),
            SignalEvent::Unknown(code) => self.stop(Outcome::UnknownSignal(code)),
        }
    }

    fn on_tick(&mut self, clock: &impl ClockPort, sink: &mut impl SnapshotSink) {
        let line = telemetry::format_snapshot(&self.snapshot, clock.epoch_millis());
        sink.emit(&line);
        self.snapshot.clear();
        self.ticks += 1;

        self.liveness.on_tick();
        if self.liveness.exceeded() {
            self.stop(Outcome::PeerSilent {
                silent_ticks: self.liveness.silent_ticks(),
            });
        }
    }

    /// Handle the bytes of one telemetry read from `channel`.
    ///
    /// A malformed frame stops the loop with a failure.
    pub fn handle_frame(&mut self, channel: Channel, raw: &[u8], port: &mut impl CommandPort) {
        if !self.is_running() {
            return;
        }
        let payload = match telemetry::decode(raw) {
            Ok(payload) => payload,
            Err(error) => {
                self.fail(RuntimeError::Malformed { channel, error });
                return;
            }
        };

        if channel == self.source {
            self.policy.on_reading(&payload, port);
        }
        self.snapshot.record(channel, payload);
        self.liveness.on_telemetry();
        self.frames += 1;
    }

    /// Stop with a fatal runtime error. Ignored once stopping.
    pub fn fail(&mut self, error: RuntimeError) {
        if self.is_running() {
            self.stop(Outcome::Failed(error));
        }
    }

    /// Complete a requested stop: `Stopping → Stopped`.
    ///
    /// Returns the outcome exactly once; `None` while running or after.
    pub fn finish(&mut self) -> Option<Outcome> {
        match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Stopping(outcome) => {
                info!(
                    "service: stopped after {} ticks, {} frames",
                    self.ticks, self.frames
                );
                Some(outcome)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    fn stop(&mut self, outcome: Outcome) {
        match &outcome {
            Outcome::Interrupted => info!("service: interrupted, shutting down"),
            Outcome::PeerSilent { silent_ticks } => warn!(
                "service: no data from server for {} ticks, shutting down",
                silent_ticks
            ),
            Outcome::UnknownSignal(code) => {
                warn!("service: unexpected signal {}, shutting down", code)
            }
            Outcome::Failed(e) => error!("service: {}", e),
        }
        self.phase = Phase::Stopping(outcome);
    }
}
