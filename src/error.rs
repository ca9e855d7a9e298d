//! Unified error types for the rig client.
//!
//! Two classes exist and both are fatal:
//!
//! - [`SetupError`]: anything that goes wrong before the event loop starts
//!   (signal plumbing, address parsing, telemetry connects, configuration).
//! - [`RuntimeError`]: anything that goes wrong inside the loop (telemetry
//!   reads, malformed frames, the signal hand-off).
//!
//! Command-channel failures are deliberately absent: that channel is
//! best-effort and never surfaces an error.

use std::io;

use thiserror::Error;

use crate::telemetry::Channel;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("setup: {0}")]
    Setup(#[from] SetupError),
    #[error("runtime: {0}")]
    Runtime(#[from] RuntimeError),
}

// ---------------------------------------------------------------------------
// Setup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SetupError {
    /// A signal handler could not be installed.
    #[error("cannot register handler for signal {signal}: {source}")]
    SignalRegistration { signal: i32, source: io::Error },

    /// The signal hand-off socket pair could not be created or configured.
    #[error("signal hand-off channel: {0}")]
    Handoff(io::Error),

    /// The periodic ticker thread could not be spawned.
    #[error("periodic timer: {0}")]
    Timer(io::Error),

    /// The target address is not a numeric IPv4 address.
    #[error("{0} is not a valid network address")]
    InvalidAddress(String),

    /// A telemetry stream could not be established.
    #[error("connect to {channel} (port {port}): {source}")]
    Connect {
        channel: Channel,
        port: u16,
        source: io::Error,
    },

    /// Readiness polling could not be set up.
    #[error("poll registration: {0}")]
    Poll(io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Runtime errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The socket reported an error on read.
    #[error("reading {channel}: {source}")]
    TelemetryRead { channel: Channel, source: io::Error },

    /// A zero-byte read: the peer closed the stream.
    #[error("reading {channel}: peer closed the connection")]
    PeerClosed { channel: Channel },

    /// The bytes read did not form a valid telemetry frame.
    #[error("reading {channel}: {error}")]
    Malformed { channel: Channel, error: FrameError },

    /// Reading the signal hand-off channel failed.
    #[error("signal hand-off read: {0}")]
    SignalRead(io::Error),

    /// The signal hand-off yielded a datagram of the wrong size.
    #[error("signal hand-off read: expected 4 bytes, got {0}")]
    SignalShortRead(usize),

    /// A signal handler or the ticker could not push into the hand-off.
    #[error("signal hand-off write failed; events were lost")]
    HandoffFailed,

    /// The multiplexed wait itself failed.
    #[error("wait: {0}")]
    Wait(io::Error),
}

// ---------------------------------------------------------------------------
// Telemetry frame errors
// ---------------------------------------------------------------------------

/// Reasons a telemetry read is rejected as a malformed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("broken data packet: missing line terminator")]
    MissingTerminator,
    #[error("broken data packet: empty payload")]
    Empty,
    #[error("broken data packet: more than one line")]
    EmbeddedTerminator,
    #[error("broken data packet: payload of {len} bytes exceeds {max}")]
    TooLong { len: usize, max: usize },
    #[error("broken data packet: payload is not valid UTF-8")]
    NotUtf8,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field failed range validation; the text names the field and rule.
    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
