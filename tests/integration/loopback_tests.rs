//! End-to-end event loop tests over loopback sockets.
//!
//! A fake rig (three TCP listeners plus a UDP receiver) stands in for the
//! device. The loop runs on its own thread with an un-armed signal demux;
//! tests inject interrupts and ticks through its sender handle.

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener, TcpStream, UdpSocket};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};

use super::mock_rig::{FixedClock, SharedSink, fields};

use rigmon::app::service::Outcome;
use rigmon::config::RigConfig;
use rigmon::connector::Connector;
use rigmon::error::{Error, FrameError, RuntimeError, SetupError};
use rigmon::event_loop::{EventLoop, run_monitor};
use rigmon::signals::{SignalDemux, SignalEvent, SignalSender};
use rigmon::telemetry::Channel;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Serialises tests that install process-wide signal handlers, so a raised
/// signal only reaches the loop that expects it.
static OS_SIGNALS: Mutex<()> = Mutex::new(());

/// Listening sockets standing in for the rig, with `config` pointed at them.
struct Endpoints {
    config: RigConfig,
    commands: UdpSocket,
    listeners: Vec<TcpListener>,
}

impl Endpoints {
    fn bind(mut config: RigConfig) -> Self {
        let commands = UdpSocket::bind("127.0.0.1:0").unwrap();
        commands.set_read_timeout(Some(TIMEOUT)).unwrap();
        let listeners: Vec<TcpListener> = (0..3)
            .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
            .collect();

        config.ports.command = commands.local_addr().unwrap().port();
        for (slot, l) in config.ports.telemetry.iter_mut().zip(&listeners) {
            *slot = l.local_addr().unwrap().port();
        }
        Self {
            config,
            commands,
            listeners,
        }
    }

    /// Server ends of out1..out3, once the client has connected.
    fn accept(&self) -> Vec<TcpStream> {
        self.listeners.iter().map(|l| l.accept().unwrap().0).collect()
    }
}

fn wait_for_lines(sink: &SharedSink, count: usize) -> Vec<String> {
    for _ in 0..500 {
        let lines = sink.lines();
        if lines.len() >= count {
            return lines;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("expected {count} snapshot lines, got {:?}", sink.lines());
}

struct FakeRig {
    /// Server ends of out1..out3.
    streams: Vec<TcpStream>,
    commands: UdpSocket,
    signals: SignalSender,
    sink: SharedSink,
    handle: JoinHandle<Outcome>,
}

impl FakeRig {
    fn start(config: RigConfig) -> Self {
        Self::start_with(config, |_| {})
    }

    /// Like `start`, but `prepare` sees the sender before the loop runs.
    fn start_with(config: RigConfig, prepare: impl FnOnce(&SignalSender)) -> Self {
        let Endpoints {
            config,
            commands,
            listeners,
        } = Endpoints::bind(config);

        let links = Connector::new(Ipv4Addr::LOCALHOST, &config)
            .connect()
            .unwrap();
        let streams = listeners.iter().map(|l| l.accept().unwrap().0).collect();

        let demux = SignalDemux::new().unwrap();
        let signals = demux.sender();
        prepare(&signals);
        let sink = SharedSink::default();
        let event_loop =
            EventLoop::new(&config, demux, links, sink.clone(), FixedClock(7)).unwrap();
        let handle = thread::spawn(move || event_loop.run());

        Self {
            streams,
            commands,
            signals,
            sink,
            handle,
        }
    }

    fn send_line(&mut self, channel: Channel, bytes: &[u8]) {
        self.streams[channel.index()].write_all(bytes).unwrap();
    }

    fn next_command(&self) -> (u16, u16, u16, u16) {
        let mut buf = [0u8; 32];
        let n = self.commands.recv(&mut buf).expect("no command datagram");
        fields(&buf[..n])
    }

    fn wait_for_lines(&self, count: usize) -> Vec<String> {
        wait_for_lines(&self.sink, count)
    }

    fn join(self) -> Outcome {
        self.handle.join().unwrap()
    }
}

#[test]
fn reading_drives_commands_and_snapshot() {
    let mut rig = FakeRig::start(RigConfig::default());

    rig.send_line(Channel::Out3, b"2.5\n");
    assert_eq!(rig.next_command(), (2, 1, 255, 2000));
    assert_eq!(rig.next_command(), (2, 1, 170, 4000));

    // The commands prove the frame was handled before this tick.
    assert!(rig.signals.notify(SignalEvent::Timer));
    let lines = rig.wait_for_lines(1);
    assert_eq!(
        lines[0],
        "{\"timestamp\": 7, \"out1\": \"--\",   \"out2\": \"--\",   \"out3\": \"2.5\"}"
    );

    assert!(rig.signals.notify(SignalEvent::Interrupt));
    assert!(matches!(rig.join(), Outcome::Interrupted));
}

#[test]
fn crossing_back_up_commands_high() {
    let mut rig = FakeRig::start(RigConfig::default());

    rig.send_line(Channel::Out3, b"1.0\n");
    rig.next_command();
    rig.next_command();
    rig.send_line(Channel::Out3, b"3.1\n");
    assert_eq!(rig.next_command(), (2, 1, 255, 1000));
    assert_eq!(rig.next_command(), (2, 1, 170, 8000));

    rig.signals.notify(SignalEvent::Interrupt);
    assert!(rig.join().is_success());
}

#[test]
fn interrupt_stops_without_waiting_for_idle_timeout() {
    let mut config = RigConfig::default();
    config.idle_timeout_ms = 60_000;
    let rig = FakeRig::start(config);

    rig.signals.notify(SignalEvent::Interrupt);
    let outcome = rig.join();
    assert!(matches!(outcome, Outcome::Interrupted));
}

#[test]
fn queued_ticks_are_all_consumed() {
    let mut config = RigConfig::default();
    config.liveness_threshold = 3;
    let rig = FakeRig::start(config);

    for _ in 0..4 {
        assert!(rig.signals.notify(SignalEvent::Timer));
    }
    let sink = rig.sink.clone();
    let outcome = rig.join();
    assert!(matches!(outcome, Outcome::PeerSilent { silent_ticks: 4 }));
    assert_eq!(sink.lines().len(), 4);
}

#[test]
fn peer_close_is_a_failure() {
    let mut rig = FakeRig::start(RigConfig::default());
    drop(rig.streams.remove(1));

    let outcome = rig.join();
    assert!(!outcome.is_success());
    assert!(matches!(
        outcome,
        Outcome::Failed(RuntimeError::PeerClosed {
            channel: Channel::Out2
        })
    ));
}

#[test]
fn unterminated_line_is_a_failure() {
    let mut rig = FakeRig::start(RigConfig::default());
    rig.send_line(Channel::Out1, b"abc");

    assert!(matches!(
        rig.join(),
        Outcome::Failed(RuntimeError::Malformed {
            channel: Channel::Out1,
            error: FrameError::MissingTerminator,
        })
    ));
}

#[test]
fn full_handoff_stops_with_failure() {
    let rig = FakeRig::start_with(RigConfig::default(), |signals| {
        let mut pushed = 0usize;
        while signals.notify(SignalEvent::Timer) {
            pushed += 1;
            assert!(pushed < 1_000_000, "hand-off never filled up");
        }
        assert!(pushed > 0);
    });
    let sink = rig.sink.clone();

    let outcome = rig.join();
    assert!(!outcome.is_success());
    assert!(matches!(outcome, Outcome::Failed(RuntimeError::HandoffFailed)));
    assert!(sink.lines().is_empty(), "no event may be handled after a lost one");
}

// ── Full monitor with OS signal handlers ──────────────────────

/// Run the monitor against `endpoints` on its own thread.
fn spawn_monitor(
    endpoints: &Endpoints,
    sink: &SharedSink,
) -> JoinHandle<rigmon::error::Result<Outcome>> {
    let config = endpoints.config.clone();
    let sink = sink.clone();
    thread::spawn(move || run_monitor("127.0.0.1", &config, sink, FixedClock(7)))
}

fn os_signal_interrupts_monitor(signal: i32) {
    let _guard = OS_SIGNALS.lock().unwrap_or_else(PoisonError::into_inner);
    let mut config = RigConfig::default();
    config.tick_interval_ms = 20;
    let endpoints = Endpoints::bind(config);
    let sink = SharedSink::default();

    let handle = spawn_monitor(&endpoints, &sink);
    let _streams = endpoints.accept();
    // Ticks start after the handlers are installed.
    wait_for_lines(&sink, 1);

    signal_hook::low_level::raise(signal).unwrap();
    let outcome = handle.join().unwrap().unwrap();
    assert!(matches!(outcome, Outcome::Interrupted));
    assert!(!sink.lines().is_empty());
}

#[test]
fn sigint_travels_through_handler_to_loop() {
    os_signal_interrupts_monitor(SIGINT);
}

#[test]
fn sigterm_travels_through_handler_to_loop() {
    os_signal_interrupts_monitor(SIGTERM);
}

#[test]
fn monitor_reports_loop_failure_as_runtime_error() {
    let _guard = OS_SIGNALS.lock().unwrap_or_else(PoisonError::into_inner);
    let endpoints = Endpoints::bind(RigConfig::default());
    let sink = SharedSink::default();

    let handle = spawn_monitor(&endpoints, &sink);
    let mut streams = endpoints.accept();
    drop(streams.remove(2));

    let result = handle.join().unwrap();
    assert!(matches!(
        result,
        Err(Error::Runtime(RuntimeError::PeerClosed {
            channel: Channel::Out3
        }))
    ));
}

#[test]
fn monitor_reports_refused_connect_as_setup_error() {
    let _guard = OS_SIGNALS.lock().unwrap_or_else(PoisonError::into_inner);
    let endpoints = Endpoints::bind(RigConfig::default());
    let config = endpoints.config.clone();
    drop(endpoints);

    let result = run_monitor("127.0.0.1", &config, SharedSink::default(), FixedClock(0));
    assert!(matches!(
        result,
        Err(Error::Setup(SetupError::Connect {
            channel: Channel::Out1,
            ..
        }))
    ));

    let result = run_monitor("rig.local", &config, SharedSink::default(), FixedClock(0));
    assert!(matches!(
        result,
        Err(Error::Setup(SetupError::InvalidAddress(_)))
    ));
}
