//! End-to-end poller behavior against a recording transport.
//!
//! Verifies that:
//! - unwired sensors are never contacted
//! - reconfiguration retires the old worker before the new one starts
//! - cancellation never waits for an in-flight fetch, and ticks finishing
//!   after cancellation are discarded

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use weighline_core::mocks::RecordingTransport;
use weighline_core::{
    PhotocellState, SensorConfig, SensorPoller, SensorSnapshot, WeightStatus,
};
use weighline_traits::clock::MonotonicClock;
use weighline_traits::clock::test_clock::TestClock;
use weighline_traits::{DeviceTransport, TransportError};

const SCALE: &str = "http://10.0.0.12/weight";
const CELL: &str = "http://10.0.0.13/cell";
const NEW_SCALE: &str = "http://10.0.1.12/weight";
const NEW_CELL: &str = "http://10.0.1.13/cell";

fn cfg(scale: Option<&str>, cell: Option<&str>, ms: u64) -> SensorConfig {
    SensorConfig::new(scale.map(String::from), cell.map(String::from), ms)
}

/// Wait until a snapshot satisfying `pred` arrives.
fn wait_for(
    rx: &crossbeam_channel::Receiver<SensorSnapshot>,
    timeout: Duration,
    pred: impl Fn(&SensorSnapshot) -> bool,
) -> Option<SensorSnapshot> {
    let deadline = Instant::now() + timeout;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(s) if pred(&s) => return Some(s),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

#[test]
fn photocell_only_line_never_touches_the_scale() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(CELL, Ok("0"));
    let poller = SensorPoller::spawn(cfg(None, Some(CELL), 10), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();

    let absent = wait_for(&rx, Duration::from_secs(2), |s| s.tick > 0).expect("first tick");
    assert_eq!(absent.photocell_state, PhotocellState::Absent);
    assert_eq!(absent.weight.status, WeightStatus::Disconnected);

    t.respond(CELL, Ok("1"));
    let present = wait_for(&rx, Duration::from_secs(2), |s| {
        s.photocell_state == PhotocellState::Present
    })
    .expect("photocell follows the endpoint");
    assert!(present.is_photocell_connected);
    assert_eq!(present.weight.status, WeightStatus::Disconnected);
    assert_eq!(present.weight.value, 0.0);
    assert!(!present.is_scale_connected);

    drop(poller);
    assert!(t.total_calls() > 0);
    assert_eq!(t.total_calls(), t.calls_to(CELL), "no scale request may be issued");
}

#[test]
fn reconfiguration_cancels_old_urls_and_ticks_immediately() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(SCALE, Ok("s-1,5"));
    t.respond(CELL, Ok("0"));
    t.respond(NEW_SCALE, Ok("i-2"));
    t.respond(NEW_CELL, Ok("1"));

    let mut poller =
        SensorPoller::spawn(cfg(Some(SCALE), Some(CELL), 10), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();
    wait_for(&rx, Duration::from_secs(2), |s| s.tick >= 2).expect("old config ticking");

    // Long interval: only an immediate first tick can arrive within the window.
    poller.reconfigure(cfg(Some(NEW_SCALE), Some(NEW_CELL), 5_000));

    let fresh = wait_for(&rx, Duration::from_millis(1_000), |s| {
        s.weight.status == WeightStatus::Unstable
    })
    .expect("new configuration ticks right away");
    assert_eq!(fresh.tick, 1);
    assert_eq!(fresh.photocell_state, PhotocellState::Present);

    // The cancelled worker may finish a fetch it had already issued; after
    // that nothing may reach the old URLs.
    thread::sleep(Duration::from_millis(50));
    let old_scale_calls = t.calls_to(SCALE);
    let old_cell_calls = t.calls_to(CELL);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(t.calls_to(SCALE), old_scale_calls, "old scale URL polled after reconfigure");
    assert_eq!(t.calls_to(CELL), old_cell_calls, "old photocell URL polled after reconfigure");
    assert_eq!(t.calls_to(NEW_SCALE), 1);
    assert_eq!(t.calls_to(NEW_CELL), 1);
}

#[test]
fn unwired_line_stays_idle_without_a_worker() {
    let t = Arc::new(RecordingTransport::new());
    let poller = SensorPoller::spawn(cfg(None, None, 10), t.clone(), MonotonicClock::new());
    assert!(!poller.is_running());

    thread::sleep(Duration::from_millis(50));
    let snap = poller.latest();
    assert_eq!(snap.tick, 0);
    assert_eq!(snap.weight.status, WeightStatus::Disconnected);
    assert!(!snap.is_scale_connected && !snap.is_photocell_connected);
    assert_eq!(t.total_calls(), 0);
}

#[test]
fn transport_failure_reports_scale_disconnected_and_not_connected() {
    // A request failure means the scale is not connected, unlike an unreadable body.
    let t = Arc::new(RecordingTransport::new());
    t.respond(SCALE, Err(TransportError::Status(502)));
    let poller = SensorPoller::spawn(cfg(Some(SCALE), None, 10), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();

    let snap = wait_for(&rx, Duration::from_secs(2), |s| s.tick > 0).expect("tick");
    assert_eq!(snap.weight.status, WeightStatus::Disconnected);
    assert!(!snap.is_scale_connected);
    assert_eq!(snap.errors.scale.as_deref(), Some("HTTP 502"));

    // Next tick retries unconditionally and recovers.
    t.respond(SCALE, Ok("s-3"));
    let ok = wait_for(&rx, Duration::from_secs(2), |s| s.is_scale_connected).expect("recovery");
    assert_eq!(ok.weight.status, WeightStatus::Stable);
    assert_eq!(ok.errors.scale, None);
}

#[test]
fn identical_reconfigure_keeps_the_running_worker() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(SCALE, Ok("s-1"));
    let config = cfg(Some(SCALE), None, 10);
    let mut poller = SensorPoller::spawn(config.clone(), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();
    let before = wait_for(&rx, Duration::from_secs(2), |s| s.tick >= 2).expect("ticking");

    poller.reconfigure(config);
    let after = wait_for(&rx, Duration::from_secs(2), |_| true).expect("still ticking");
    assert!(after.tick > before.tick, "tick counter must not restart");
}

#[test]
fn drop_is_prompt_with_a_long_interval() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(CELL, Ok("1"));
    let poller = SensorPoller::spawn(cfg(None, Some(CELL), 5_000), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();
    wait_for(&rx, Duration::from_secs(2), |s| s.tick == 1).expect("first tick");

    let start = Instant::now();
    drop(poller);
    let took = start.elapsed();
    assert!(took < Duration::from_millis(200), "shutdown took {took:?}");
    assert_eq!(t.calls_to(CELL), 1);
}

/// Transport that blocks for a while before answering.
struct SlowTransport {
    delay: Duration,
}

impl DeviceTransport for SlowTransport {
    fn get_text(&self, _url: &str) -> Result<String, TransportError> {
        thread::sleep(self.delay);
        Ok("s-9".to_string())
    }
}

#[test]
fn in_flight_tick_is_discarded_after_reconfigure() {
    let mut poller = SensorPoller::spawn(
        cfg(Some(SCALE), None, 10),
        SlowTransport {
            delay: Duration::from_millis(80),
        },
        MonotonicClock::new(),
    );
    // Let the first fetch get in flight, then unwire the line.
    thread::sleep(Duration::from_millis(20));
    poller.reconfigure(cfg(None, None, 10));
    assert!(!poller.is_running());

    thread::sleep(Duration::from_millis(150));
    let snap = poller.latest();
    assert_eq!(snap.tick, 0, "stale tick leaked into the new configuration");
    assert_eq!(snap.weight.status, WeightStatus::Disconnected);
}

#[test]
fn stop_keeps_last_snapshot_readable() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(SCALE, Ok("s-4,25"));
    let mut poller = SensorPoller::spawn(cfg(Some(SCALE), None, 10), t.clone(), MonotonicClock::new());
    let rx = poller.subscribe();
    wait_for(&rx, Duration::from_secs(2), |s| s.tick >= 1).expect("tick");

    poller.stop();
    assert!(!poller.is_running());
    let calls = t.calls_to(SCALE);
    let snap = poller.latest();
    assert_eq!(snap.weight.status, WeightStatus::Stable);
    assert!((snap.weight.value - 4.25).abs() < 1e-12);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(t.calls_to(SCALE), calls);
}

#[test]
fn snapshots_are_stamped_with_the_poller_clock() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(SCALE, Ok("s-2"));
    let clock = TestClock::new();
    clock.advance(Duration::from_secs(42));

    let idle = SensorPoller::spawn(cfg(None, None, 10), t.clone(), clock.clone());
    assert_eq!(
        idle.latest().weight.timestamp,
        std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(42)
    );

    let poller = SensorPoller::spawn(cfg(Some(SCALE), None, 10), t.clone(), clock.clone());
    let rx = poller.subscribe();
    let snap = wait_for(&rx, Duration::from_secs(2), |s| s.tick > 0).expect("tick");
    assert_eq!(
        snap.weight.timestamp,
        std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(42)
    );
}

/// Hangs on one URL, answers every other one at once.
struct HangingTransport {
    hang_on: &'static str,
    hang_for: Duration,
}

impl DeviceTransport for HangingTransport {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        if url == self.hang_on {
            thread::sleep(self.hang_for);
        }
        Ok("s-1".to_string())
    }
}

#[test]
fn hung_fetch_does_not_delay_reconfigure() {
    let mut poller = SensorPoller::spawn(
        cfg(Some(SCALE), None, 10),
        HangingTransport {
            hang_on: SCALE,
            hang_for: Duration::from_secs(3),
        },
        MonotonicClock::new(),
    );
    let rx = poller.subscribe();
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    poller.reconfigure(cfg(Some(NEW_SCALE), None, 5_000));
    let blocked = start.elapsed();
    assert!(blocked < Duration::from_millis(200), "reconfigure blocked {blocked:?}");

    let fresh = wait_for(&rx, Duration::from_millis(200), |s| s.tick == 1)
        .expect("new configuration ticks while the old fetch still hangs");
    assert_eq!(fresh.weight.status, WeightStatus::Stable);
    assert!(start.elapsed() < Duration::from_millis(300));

    let start = Instant::now();
    drop(poller);
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[test]
fn hung_fetch_does_not_delay_stop_and_never_publishes() {
    let mut poller = SensorPoller::spawn(
        cfg(Some(SCALE), None, 10),
        HangingTransport {
            hang_on: SCALE,
            hang_for: Duration::from_millis(150),
        },
        MonotonicClock::new(),
    );
    let rx = poller.subscribe();
    thread::sleep(Duration::from_millis(30));

    let start = Instant::now();
    poller.stop();
    assert!(start.elapsed() < Duration::from_millis(100));

    // The stranded fetch completes later but its tick is rejected.
    thread::sleep(Duration::from_millis(250));
    assert!(rx.try_recv().is_err());
    assert_eq!(poller.latest().tick, 0);
}

#[test]
fn subscriber_registered_at_spawn_sees_the_first_tick() {
    let t = Arc::new(RecordingTransport::new());
    t.respond(CELL, Ok("1"));
    let (poller, rx) = SensorPoller::spawn_with_subscriber(
        cfg(None, Some(CELL), 5_000),
        t.clone(),
        MonotonicClock::new(),
    );

    let first = rx.recv_timeout(Duration::from_secs(2)).expect("first tick");
    assert_eq!(first.tick, 1);
    assert_eq!(first.generation, poller.latest().generation);
}
