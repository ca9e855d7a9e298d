//! Wait-and-dispatch cycle.
//!
//! One thread, one blocking call: `Poll::poll` over the signal hand-off and
//! the three telemetry streams, bounded by the idle timeout. Each wake
//! visits the ready sources once, in a fixed order (signals, `out1`,
//! `out2`, `out3`), and performs one logical read per source: one queued
//! signal, or one telemetry line. Sources are not drained to empty.
//!
//! mio readiness is edge-triggered, so a source left with pending data
//! would never be reported again. Every source is re-registered after its
//! read, which re-arms it; leftover data shows up on the next wake.

use std::io::ErrorKind;
use std::time::Duration;

use log::{debug, info, trace};
use mio::{Events, Interest, Poll, Token};

use crate::adapters::command_link::UdpCommandLink;
use crate::app::ports::{ClockPort, SnapshotSink};
use crate::app::service::{LoopState, Outcome, RigService};
use crate::config::RigConfig;
use crate::connector::{Connector, RigLinks, TelemetryLink, parse_address};
use crate::error::{self, RuntimeError, SetupError};
use crate::signals::{SignalDemux, is_transient};
use crate::telemetry::FRAME_CAPACITY;

const SIGNALS: Token = Token(0);
const SOURCES: usize = 4;
const EVENT_CAPACITY: usize = 16;

fn telemetry_token(index: usize) -> Token {
    Token(index + 1)
}

pub struct EventLoop<S: SnapshotSink, C: ClockPort> {
    poll: Poll,
    events: Events,
    signals: SignalDemux,
    telemetry: [TelemetryLink; 3],
    command: UdpCommandLink,
    service: RigService,
    sink: S,
    clock: C,
    idle_timeout: Duration,
    buf: [u8; FRAME_CAPACITY],
}

impl<S: SnapshotSink, C: ClockPort> EventLoop<S, C> {
    /// Register every source with a fresh poller.
    pub fn new(
        config: &RigConfig,
        mut signals: SignalDemux,
        links: RigLinks,
        sink: S,
        clock: C,
    ) -> Result<Self, SetupError> {
        let RigLinks {
            command,
            mut telemetry,
        } = links;

        let poll = Poll::new().map_err(SetupError::Poll)?;
        let registry = poll.registry();
        registry
            .register(signals.source_mut(), SIGNALS, Interest::READABLE)
            .map_err(SetupError::Poll)?;
        for (index, link) in telemetry.iter_mut().enumerate() {
            registry
                .register(link.stream_mut(), telemetry_token(index), Interest::READABLE)
                .map_err(SetupError::Poll)?;
        }

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            signals,
            telemetry,
            command,
            service: RigService::new(config),
            sink,
            clock,
            idle_timeout: config.idle_timeout(),
            buf: [0; FRAME_CAPACITY],
        })
    }

    pub fn state(&self) -> LoopState {
        self.service.state()
    }

    pub fn service(&self) -> &RigService {
        &self.service
    }

    /// Run until a stop is requested, then release every socket and the
    /// signal handlers.
    pub fn run(mut self) -> Outcome {
        info!("event loop: running");
        loop {
            if let Some(outcome) = self.service.finish() {
                drop(self);
                debug!("event loop: resources released");
                return outcome;
            }
            self.iterate();
        }
    }

    /// One wait plus dispatch.
    pub fn iterate(&mut self) {
        if !self.service.is_running() {
            return;
        }
        if self.signals.handoff_failed() {
            self.service.fail(RuntimeError::HandoffFailed);
            return;
        }

        match self.poll.poll(&mut self.events, Some(self.idle_timeout)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => return,
            Err(e) => {
                self.service.fail(RuntimeError::Wait(e));
                return;
            }
        }
        if self.events.is_empty() {
            trace!("event loop: idle wake");
            return;
        }

        let mut ready = [false; SOURCES];
        for event in &self.events {
            if let Some(slot) = ready.get_mut(event.token().0) {
                *slot = true;
            }
        }

        for (index, is_ready) in ready.into_iter().enumerate() {
            if !self.service.is_running() {
                break;
            }
            if !is_ready {
                continue;
            }
            if index == SIGNALS.0 {
                self.read_signal();
            } else {
                self.read_telemetry(index - 1);
            }
        }
    }

    fn read_signal(&mut self) {
        match self.signals.next_event() {
            Ok(Some(event)) => {
                trace!("event loop: signal {:?}", event);
                self.service.handle_signal(event, &self.clock, &mut self.sink);
            }
            Ok(None) => {}
            Err(e) => {
                self.service.fail(e);
                return;
            }
        }
        if let Err(e) =
            self.poll
                .registry()
                .reregister(self.signals.source_mut(), SIGNALS, Interest::READABLE)
        {
            self.service.fail(RuntimeError::Wait(e));
        }
    }

    fn read_telemetry(&mut self, index: usize) {
        let link = &mut self.telemetry[index];
        let channel = link.channel();
        match link.read(&mut self.buf) {
            Ok(0) => {
                self.service.fail(RuntimeError::PeerClosed { channel });
                return;
            }
            Ok(n) => {
                trace!("event loop: {} bytes on {}", n, channel);
                self.service
                    .handle_frame(channel, &self.buf[..n], &mut self.command);
            }
            Err(e) if is_transient(&e) => {}
            Err(source) => {
                self.service
                    .fail(RuntimeError::TelemetryRead { channel, source });
                return;
            }
        }
        if !self.service.is_running() {
            return;
        }
        let link = &mut self.telemetry[index];
        if let Err(e) = self.poll.registry().reregister(
            link.stream_mut(),
            telemetry_token(index),
            Interest::READABLE,
        ) {
            self.service.fail(RuntimeError::Wait(e));
        }
    }
}

/// Install the signal handlers, connect to the rig at `address`, start the
/// ticker and run the loop to completion.
///
/// Orderly stops return `Ok`; a fatal runtime failure returns
/// `Error::Runtime`.
pub fn run_monitor<S: SnapshotSink, C: ClockPort>(
    address: &str,
    config: &RigConfig,
    sink: S,
    clock: C,
) -> error::Result<Outcome> {
    let mut signals = SignalDemux::new()?;
    signals.install_handlers()?;

    let address = parse_address(address)?;
    info!("event loop: connecting to rig at {}", address);
    let links = Connector::new(address, config).connect()?;

    signals.start_ticker(config.tick_interval())?;
    let event_loop = EventLoop::new(config, signals, links, sink, clock)?;
    Ok(event_loop.run().into_result()?)
}
