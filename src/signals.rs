//! Signal demultiplexer: asynchronous signals in, pollable events out.
//!
//! Signal handlers and the periodic ticker never touch loop state. They
//! encode the signal number and push it, without blocking, into a bounded
//! datagram socket pair. The read end is one of the sources the event loop
//! polls, so signals are handled in order with telemetry.
//!
//! ```text
//! ┌──────────────┐
//! │ SIGINT/TERM  │──┐
//! │ SIGALRM      │──┤   ┌──────────────────┐     ┌─────────────┐
//! │ ticker (20ms)│──┴──▶│ UnixDatagram pair│────▶│ event loop  │
//! └──────────────┘      │ (non-blocking)   │     │ (poll)      │
//!                       └──────────────────┘     └─────────────┘
//! ```
//!
//! A failed push is never retried from handler context; it latches a flag
//! the loop checks on every iteration.

use std::io::{self, ErrorKind};
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};
use mio::net::UnixDatagram as MioUnixDatagram;
use signal_hook::SigId;
use signal_hook::consts::{SIGALRM, SIGINT, SIGTERM};

use crate::error::{RuntimeError, SetupError};

/// Encoded size of one hand-off record.
const RECORD_LEN: usize = core::mem::size_of::<i32>();

/// One signal occurrence as seen by the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// Operator interrupt or termination request.
    Interrupt,
    /// Periodic snapshot tick.
    Timer,
    /// Anything else that reached the hand-off.
    Unknown(i32),
}

impl SignalEvent {
    pub fn from_code(code: i32) -> Self {
        match code {
            SIGINT | SIGTERM => Self::Interrupt,
            SIGALRM => Self::Timer,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Interrupt => SIGINT,
            Self::Timer => SIGALRM,
            Self::Unknown(code) => code,
        }
    }
}

// ── Write side ────────────────────────────────────────────────

/// Producer handle of the hand-off channel.
///
/// Cheap to clone; every clone shares the same socket and failure flag.
#[derive(Clone)]
pub struct SignalSender {
    socket: Arc<UnixDatagram>,
    failed: Arc<AtomicBool>,
}

impl SignalSender {
    /// Push a raw signal number.
    ///
    /// Async-signal-safe: one non-blocking `send(2)` and, on failure, one
    /// atomic store. Returns `false` if the record was lost.
    pub fn notify_code(&self, code: i32) -> bool {
        if self.socket.send(&code.to_ne_bytes()).is_ok() {
            true
        } else {
            self.failed.store(true, Ordering::Release);
            false
        }
    }

    pub fn notify(&self, event: SignalEvent) -> bool {
        self.notify_code(event.code())
    }
}

// ── Periodic ticker ───────────────────────────────────────────

/// Thread that pushes a `Timer` record every interval.
///
/// Late wake-ups are not caught up with a burst; like a coalesced
/// `SIGALRM`, missed periods are dropped.
struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    fn start(sender: SignalSender, interval: Duration) -> Result<Self, SetupError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("rig-ticker".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    }
                    if flag.load(Ordering::Acquire) || !sender.notify(SignalEvent::Timer) {
                        break;
                    }
                    next += interval;
                    let now = Instant::now();
                    if next <= now {
                        next = now + interval;
                    }
                }
            })
            .map_err(SetupError::Timer)?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ── Demux ─────────────────────────────────────────────────────

/// Owner of the hand-off channel, the installed handlers and the ticker.
///
/// Dropping it unregisters the handlers and stops the ticker.
pub struct SignalDemux {
    receiver: MioUnixDatagram,
    sender: SignalSender,
    handlers: Vec<SigId>,
    ticker: Option<Ticker>,
}

impl SignalDemux {
    /// Create an un-armed demux: the channel exists but nothing feeds it
    /// except explicit [`SignalSender`] handles.
    pub fn new() -> Result<Self, SetupError> {
        let (tx, rx) = UnixDatagram::pair().map_err(SetupError::Handoff)?;
        tx.set_nonblocking(true).map_err(SetupError::Handoff)?;
        rx.set_nonblocking(true).map_err(SetupError::Handoff)?;

        Ok(Self {
            receiver: MioUnixDatagram::from_std(rx),
            sender: SignalSender {
                socket: Arc::new(tx),
                failed: Arc::new(AtomicBool::new(false)),
            },
            handlers: Vec::new(),
            ticker: None,
        })
    }

    /// Route SIGINT, SIGTERM and SIGALRM into the channel.
    pub fn install_handlers(&mut self) -> Result<(), SetupError> {
        for signal in [SIGINT, SIGTERM, SIGALRM] {
            self.register(signal)?;
        }
        info!("signals: interrupt and timer routed to hand-off");
        Ok(())
    }

    /// Start the periodic ticker. Nothing drains the channel before the
    /// event loop runs, so call this once the streams are connected.
    pub fn start_ticker(&mut self, interval: Duration) -> Result<(), SetupError> {
        // Replacing a running ticker stops it first.
        self.ticker = None;
        self.ticker = Some(Ticker::start(self.sender.clone(), interval)?);
        info!("signals: tick every {} ms", interval.as_millis());
        Ok(())
    }

    fn register(&mut self, signal: i32) -> Result<(), SetupError> {
        let sender = self.sender.clone();
        // SAFETY: the handler only calls `notify_code`, which performs one
        // non-blocking send(2) on a socket the closure keeps alive and at
        // most one atomic store. Both are async-signal-safe; nothing here
        // allocates, locks or logs.
        let id = unsafe {
            signal_hook::low_level::register(signal, move || {
                sender.notify_code(signal);
            })
        }
        .map_err(|source| SetupError::SignalRegistration { signal, source })?;
        self.handlers.push(id);
        debug!("signals: handler installed for {}", signal);
        Ok(())
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        !self.handlers.is_empty() || self.ticker.is_some()
    }

    /// A new producer handle on the same channel.
    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    /// True once any producer failed to push a record.
    pub fn handoff_failed(&self) -> bool {
        self.sender.failed.load(Ordering::Acquire)
    }

    /// The pollable read end, for registration with the event loop.
    pub fn source_mut(&mut self) -> &mut MioUnixDatagram {
        &mut self.receiver
    }

    /// Read one queued record. `Ok(None)` when nothing is pending.
    pub fn next_event(&self) -> Result<Option<SignalEvent>, RuntimeError> {
        let mut buf = [0u8; RECORD_LEN];
        match self.receiver.recv(&mut buf) {
            Ok(RECORD_LEN) => Ok(Some(SignalEvent::from_code(i32::from_ne_bytes(buf)))),
            Ok(n) => Err(RuntimeError::SignalShortRead(n)),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(RuntimeError::SignalRead(e)),
        }
    }
}

impl Drop for SignalDemux {
    fn drop(&mut self) {
        for id in self.handlers.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// `WouldBlock` after a readiness report, or a read cut short by a signal.
pub(crate) fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
}
