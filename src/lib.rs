//! Rig monitor library.
//!
//! A monitoring and control client for the sensor/actuator test rig: three
//! telemetry streams in, one composite snapshot per tick out, and a
//! hysteresis policy that drives the actuator over a UDP command channel.
//! The modules are public so integration tests can drive the event loop
//! against loopback sockets and the service against in-memory ports.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod command;
pub mod config;
pub mod connector;
pub mod control;
pub mod error;
pub mod event_loop;
pub mod liveness;
pub mod signals;
pub mod telemetry;
