//! Telemetry line codec and the per-tick channel snapshot.
//!
//! Wire format, one frame per read:
//! ```text
//! ┌──────────────────────────┬────┐
//! │ payload (1..=19 B, text) │ LF │
//! └──────────────────────────┴────┘
//! ```
//!
//! There is no reassembly: a read that does not end in exactly one line
//! terminator is a broken packet, not a partial one.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Largest payload a frame may carry (terminator excluded).
pub const MAX_PAYLOAD_LEN: usize = 19;

/// Read buffer size for one telemetry frame (payload + terminator).
pub const FRAME_CAPACITY: usize = MAX_PAYLOAD_LEN + 1;

const TERMINATOR: u8 = b'\n';

/// Text shown for a channel with no data since the last tick.
pub const NO_DATA: &str = "--";

/// Display width of the `out1`/`out2` fields, comma included.
const FIELD_WIDTH: usize = 7;

/// Owned, bounds-checked telemetry payload.
pub type Payload = heapless::String<MAX_PAYLOAD_LEN>;

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// One of the three telemetry streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Out1,
    Out2,
    Out3,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Out1, Channel::Out2, Channel::Out3];

    /// Zero-based slot index.
    pub const fn index(self) -> usize {
        match self {
            Self::Out1 => 0,
            Self::Out2 => 1,
            Self::Out3 => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Out1 => "out1",
            Self::Out2 => "out2",
            Self::Out3 => "out3",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one telemetry read into its payload.
///
/// The input must end in exactly one `\n`, which is stripped. Empty
/// payloads, embedded terminators, oversize payloads and invalid UTF-8 are
/// all rejected.
pub fn decode(raw: &[u8]) -> Result<Payload, FrameError> {
    let Some((&last, body)) = raw.split_last() else {
        return Err(FrameError::MissingTerminator);
    };
    if last != TERMINATOR {
        return Err(FrameError::MissingTerminator);
    }
    if body.is_empty() {
        return Err(FrameError::Empty);
    }
    if body.contains(&TERMINATOR) {
        return Err(FrameError::EmbeddedTerminator);
    }
    if body.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::TooLong {
            len: body.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let text = core::str::from_utf8(body).map_err(|_| FrameError::NotUtf8)?;
    let mut payload = Payload::new();
    payload.push_str(text).map_err(|()| FrameError::TooLong {
        len: body.len(),
        max: MAX_PAYLOAD_LEN,
    })?;
    Ok(payload)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Latest reading of one channel within the current tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Reading {
    /// Nothing arrived since the last emission.
    #[default]
    NoData,
    Value(Payload),
}

impl Reading {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoData => NO_DATA,
            Self::Value(p) => p.as_str(),
        }
    }

    /// JSON string literal for this reading.
    fn to_json(&self) -> String {
        serde_json::Value::from(self.as_str()).to_string()
    }
}

/// Readings of all three channels since the last periodic emission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSnapshot {
    slots: [Reading; 3],
}

impl ChannelSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot for `channel` with a fresh payload.
    pub fn record(&mut self, channel: Channel, payload: Payload) {
        self.slots[channel.index()] = Reading::Value(payload);
    }

    pub fn get(&self, channel: Channel) -> &Reading {
        &self.slots[channel.index()]
    }

    /// Reset every slot to [`Reading::NoData`].
    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    /// True when no channel has reported since the last clear.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|r| *r == Reading::NoData)
    }
}

/// Render one snapshot record.
///
/// ```text
/// {"timestamp": 1700000000000, "out1": "1.0",  "out2": "--",   "out3": "--"}
/// ```
///
/// The caller clears the snapshot right after emitting this line.
pub fn format_snapshot(snapshot: &ChannelSnapshot, timestamp_ms: u64) -> String {
    let out1 = format!("{},", snapshot.get(Channel::Out1).to_json());
    let out2 = format!("{},", snapshot.get(Channel::Out2).to_json());
    let out3 = snapshot.get(Channel::Out3).to_json();
    format!(
        "{{\"timestamp\": {timestamp_ms}, \"out1\": {out1:<width$} \"out2\": {out2:<width$} \"out3\": {out3}}}",
        width = FIELD_WIDTH,
    )
}
