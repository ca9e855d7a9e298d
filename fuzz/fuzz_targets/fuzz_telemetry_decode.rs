//! Fuzz target: `telemetry::decode`
//!
//! Feeds arbitrary reads to the frame decoder, then pushes every accepted
//! payload through the snapshot formatter.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Accepted payloads are non-empty, at most 19 bytes, and free of `\n`
//! - The payload is exactly the input minus its final byte
//! - A formatted snapshot is always one line
//!
//! cargo fuzz run fuzz_telemetry_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use rigmon::telemetry::{self, Channel, ChannelSnapshot, MAX_PAYLOAD_LEN};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = telemetry::decode(data) else {
        return;
    };

    assert!(!payload.is_empty(), "decoder must not yield empty payload");
    assert!(payload.len() <= MAX_PAYLOAD_LEN, "payload exceeds MAX_PAYLOAD_LEN");
    assert!(!payload.contains('\n'), "payload kept a terminator");
    assert_eq!(payload.as_bytes(), &data[..data.len() - 1]);

    let mut snapshot = ChannelSnapshot::new();
    snapshot.record(Channel::Out3, payload);
    let line = telemetry::format_snapshot(&snapshot, u64::MAX);
    assert!(!line.contains('\n'), "snapshot record spans lines");
});
