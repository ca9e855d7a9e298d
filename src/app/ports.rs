//! Port traits: the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RigService (domain)
//! ```
//!
//! Driven adapters (UDP command link, stdout sink, wall clock) implement
//! these traits. [`RigService`](super::service::RigService) consumes them via
//! generics, so the decision logic never touches a socket directly.

// ───────────────────────────────────────────────────────────────
// Command port (domain → actuator channel)
// ───────────────────────────────────────────────────────────────

/// Write-side port for encoded actuator commands.
///
/// Delivery is best-effort: implementations swallow send failures, so the
/// method is infallible by contract.
pub trait CommandPort {
    fn send(&mut self, frame: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Snapshot sink (domain → console / log)
// ───────────────────────────────────────────────────────────────

/// Receives one formatted snapshot record per periodic tick.
pub trait SnapshotSink {
    fn emit(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for snapshot timestamps.
pub trait ClockPort {
    /// Milliseconds since the Unix epoch.
    fn epoch_millis(&self) -> u64;
}

/// Collects records in memory.
impl SnapshotSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}
