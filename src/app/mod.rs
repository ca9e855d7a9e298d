//! Application core: the monitor's decision logic, free of sockets.
//!
//! [`service::RigService`] applies telemetry and signal events to the
//! snapshot, control policy and liveness watchdog. All outbound traffic
//! goes through the **port traits** in [`ports`], so the core runs in
//! tests against in-memory adapters.

pub mod ports;
pub mod service;
