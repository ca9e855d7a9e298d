//! Integration tests for the RigService → policy → command pipeline.
//!
//! Drive the service with decoded signals and raw telemetry reads and
//! check the commands and snapshot records it produces.

use super::mock_rig::{FixedClock, RecordingPort};

use rigmon::app::service::{LoopState, Outcome, RigService};
use rigmon::config::RigConfig;
use rigmon::control::Regime;
use rigmon::error::{FrameError, RuntimeError};
use rigmon::signals::SignalEvent;
use rigmon::telemetry::{Channel, NO_DATA};

const LOW_PAIR: [(u16, u16, u16, u16); 2] = [(2, 1, 255, 2000), (2, 1, 170, 4000)];
const HIGH_PAIR: [(u16, u16, u16, u16); 2] = [(2, 1, 255, 1000), (2, 1, 170, 8000)];

fn make_service() -> (RigService, RecordingPort, Vec<String>) {
    (
        RigService::new(&RigConfig::default()),
        RecordingPort::new(),
        Vec::new(),
    )
}

fn tick(svc: &mut RigService, lines: &mut Vec<String>) {
    svc.handle_signal(SignalEvent::Timer, &FixedClock(1_700_000_000_000), lines);
}

// ── Control scenarios ─────────────────────────────────────────

#[test]
fn low_reading_from_unset_sends_low_pair() {
    let (mut svc, mut port, _) = make_service();
    assert_eq!(svc.regime(), Regime::Unset);

    svc.handle_frame(Channel::Out3, b"2.5\n", &mut port);

    assert_eq!(port.commands(), LOW_PAIR.to_vec());
    assert_eq!(svc.regime(), Regime::Low);
}

#[test]
fn crossing_up_sends_high_pair() {
    let (mut svc, mut port, _) = make_service();
    svc.handle_frame(Channel::Out3, b"2.5\n", &mut port);
    port.clear();

    svc.handle_frame(Channel::Out3, b"3.1\n", &mut port);

    assert_eq!(port.commands(), HIGH_PAIR.to_vec());
    assert_eq!(svc.regime(), Regime::High);
}

#[test]
fn non_numeric_reading_is_recorded_without_commands() {
    let (mut svc, mut port, mut lines) = make_service();
    svc.handle_frame(Channel::Out3, b"abc\n", &mut port);

    assert!(port.frames.is_empty());
    assert_eq!(svc.regime(), Regime::Unset);
    assert_eq!(svc.snapshot().get(Channel::Out3).as_str(), "abc");

    tick(&mut svc, &mut lines);
    assert!(lines[0].ends_with("\"out3\": \"abc\"}"), "{}", lines[0]);
}

#[test]
fn repeated_high_readings_send_one_pair() {
    let (mut svc, mut port, _) = make_service();
    for text in [&b"3.0\n"[..], b"4.2\n", b"9\n", b"3.5\n"] {
        svc.handle_frame(Channel::Out3, text, &mut port);
    }
    assert_eq!(port.commands(), HIGH_PAIR.to_vec());
}

#[test]
fn other_channels_never_drive_the_policy() {
    let (mut svc, mut port, _) = make_service();
    svc.handle_frame(Channel::Out1, b"0.1\n", &mut port);
    svc.handle_frame(Channel::Out2, b"99\n", &mut port);
    assert!(port.frames.is_empty());
    assert_eq!(svc.regime(), Regime::Unset);
}

// ── Snapshot ──────────────────────────────────────────────────

#[test]
fn tick_emits_latest_values_then_resets() {
    let (mut svc, mut port, mut lines) = make_service();
    svc.handle_frame(Channel::Out1, b"1.0\n", &mut port);
    svc.handle_frame(Channel::Out1, b"1.5\n", &mut port);

    tick(&mut svc, &mut lines);
    tick(&mut svc, &mut lines);

    assert_eq!(
        lines[0],
        "{\"timestamp\": 1700000000000, \"out1\": \"1.5\",  \"out2\": \"--\",   \"out3\": \"--\"}"
    );
    assert!(lines[1].contains("\"out1\": \"--\""));
    for channel in Channel::ALL {
        assert_eq!(svc.snapshot().get(channel).as_str(), NO_DATA);
    }
}

// ── Liveness ──────────────────────────────────────────────────

#[test]
fn fifty_one_silent_ticks_stop_gracefully() {
    let (mut svc, _, mut lines) = make_service();
    for _ in 0..50 {
        tick(&mut svc, &mut lines);
    }
    assert_eq!(svc.state(), LoopState::Running);

    tick(&mut svc, &mut lines);
    assert_eq!(svc.state(), LoopState::Stopping);
    assert_eq!(lines.len(), 51);

    let outcome = svc.finish().unwrap();
    assert!(matches!(outcome, Outcome::PeerSilent { silent_ticks: 51 }));
    assert!(outcome.is_success());
}

#[test]
fn telemetry_on_any_channel_resets_the_watchdog() {
    let (mut svc, mut port, mut lines) = make_service();
    for _ in 0..40 {
        tick(&mut svc, &mut lines);
    }
    svc.handle_frame(Channel::Out2, b"x\n", &mut port);
    assert_eq!(svc.silent_ticks(), 0);

    for _ in 0..50 {
        tick(&mut svc, &mut lines);
    }
    assert!(svc.is_running());
    tick(&mut svc, &mut lines);
    assert!(!svc.is_running());
}

// ── Shutdown paths ────────────────────────────────────────────

#[test]
fn interrupt_stops_with_success() {
    let (mut svc, _, mut lines) = make_service();
    svc.handle_signal(SignalEvent::Interrupt, &FixedClock(0), &mut lines);
    let outcome = svc.finish().unwrap();
    assert!(matches!(outcome, Outcome::Interrupted));
    assert!(outcome.is_success());
    assert!(lines.is_empty());
}

#[test]
fn malformed_frame_stops_with_failure() {
    let (mut svc, mut port, _) = make_service();
    svc.handle_frame(Channel::Out1, b"12", &mut port);
    let outcome = svc.finish().unwrap();
    assert!(!outcome.is_success());
    assert!(matches!(
        outcome,
        Outcome::Failed(RuntimeError::Malformed {
            channel: Channel::Out1,
            error: FrameError::MissingTerminator,
        })
    ));
}

#[test]
fn two_lines_in_one_read_are_malformed() {
    let (mut svc, mut port, _) = make_service();
    svc.handle_frame(Channel::Out3, b"2.5\n3.5\n", &mut port);
    assert!(port.frames.is_empty());
    assert!(matches!(
        svc.finish(),
        Some(Outcome::Failed(RuntimeError::Malformed {
            error: FrameError::EmbeddedTerminator,
            ..
        }))
    ));
}
