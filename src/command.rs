//! Fixed-layout binary command codec for the rig's command port.
//!
//! Wire format, all fields big-endian `u16`:
//! ```text
//! set value  ┌──────────┬────────────────┬─────────────┬───────┐
//!  (8 bytes) │ kind = 2 │ target channel │ property id │ value │
//!            └──────────┴────────────────┴─────────────┴───────┘
//! read       ┌──────────┬────────────────┬─────────────┐
//!  (6 bytes) │ kind = 1 │ target channel │ property id │
//!            └──────────┴────────────────┴─────────────┘
//! ```
//!
//! Only the encoding side exists; nothing is ever received on this port.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Size of an encoded set-value command.
pub const COMMAND_LEN: usize = 8;

/// Size of an encoded read request.
pub const READ_REQUEST_LEN: usize = 6;

/// Operation carried in the first field of every command datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FrameKind {
    Read = 1,
    /// "Set value".
    Write = 2,
}

/// Device properties addressable on each actuator channel.
///
/// Ids are defined by the peer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Property {
    Enabled = 14,
    MinDuration = 42,
    MaxDuration = 43,
    Amplitude = 170,
    Frequency = 255,
    GlitchChance = 300,
}

impl Property {
    pub const ALL: [Property; 6] = [
        Property::Enabled,
        Property::MinDuration,
        Property::MaxDuration,
        Property::Amplitude,
        Property::Frequency,
        Property::GlitchChance,
    ];

    pub const fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::MinDuration => "min-duration",
            Self::MaxDuration => "max-duration",
            Self::Amplitude => "amplitude",
            Self::Frequency => "frequency",
            Self::GlitchChance => "glitch-chance",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a property name or id is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown property '{0}'")]
pub struct UnknownProperty(pub String);

impl FromStr for Property {
    type Err = UnknownProperty;

    /// Accepts the kebab-case name or the numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u16>() {
            return Self::from_id(id).ok_or_else(|| UnknownProperty(s.to_owned()));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProperty(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Encode the four 16-bit fields of a command, big-endian, in wire order.
pub fn encode(kind: FrameKind, target: u16, property: u16, value: u16) -> [u8; COMMAND_LEN] {
    let mut out = [0u8; COMMAND_LEN];
    for (chunk, field) in out
        .chunks_exact_mut(2)
        .zip([kind as u16, target, property, value])
    {
        chunk.copy_from_slice(&field.to_be_bytes());
    }
    out
}

/// Property id as sent on the wire: a catalog entry or any raw 16-bit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId(pub u16);

impl From<Property> for PropertyId {
    fn from(property: Property) -> Self {
        Self(property.id())
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Property::from_id(self.0) {
            Some(property) => fmt::Display::fmt(&property, f),
            None => write!(f, "property {}", self.0),
        }
    }
}

impl FromStr for PropertyId {
    type Err = UnknownProperty;

    /// A catalog name, or any numeric id whether catalogued or not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u16>() {
            Ok(id) => Ok(Self(id)),
            Err(_) => s.parse::<Property>().map(Self::from),
        }
    }
}

/// A set-value command for one property of one actuator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMessage {
    pub target: u16,
    pub property: PropertyId,
    pub value: u16,
}

impl CommandMessage {
    pub fn set(target: u16, property: impl Into<PropertyId>, value: u16) -> Self {
        Self {
            target,
            property: property.into(),
            value,
        }
    }

    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        encode(FrameKind::Write, self.target, self.property.0, self.value)
    }
}

/// A property read request. The reply, if any, is not consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub target: u16,
    pub property: Property,
}

impl ReadRequest {
    pub const fn new(target: u16, property: Property) -> Self {
        Self { target, property }
    }

    pub fn encode(&self) -> [u8; READ_REQUEST_LEN] {
        let full = encode(FrameKind::Read, self.target, self.property.id(), 0);
        let mut out = [0u8; READ_REQUEST_LEN];
        out.copy_from_slice(&full[..READ_REQUEST_LEN]);
        out
    }
}
