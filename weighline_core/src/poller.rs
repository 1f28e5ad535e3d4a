//! Background polling of the scale and photocell endpoints.
//!
//! A `SensorPoller` owns at most one live worker thread per configuration.
//! The worker runs a tick immediately, then one tick per polling interval;
//! each tick fetches both wired sensors (concurrently when both are wired),
//! runs the parsers and publishes one `SensorSnapshot`.
//!
//! Reconfiguring, stopping or dropping the poller cancels the worker without
//! waiting for it: an in-flight fetch is left to finish on its own thread.
//! Every worker is tagged with a generation, and `Shared::publish` only
//! accepts snapshots from the current one, so a superseded worker can never
//! reach `latest()` or the subscribers.
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::SystemTime;

use weighline_traits::clock::Clock;
use weighline_traits::{DeviceTransport, TransportError};

use crate::config::SensorConfig;
use crate::photocell::{INVALID_RESPONSE, parse_photocell};
use crate::reading::{PhotocellState, SensorErrors, SensorSnapshot, WeightReading};
use crate::weight_parser::parse_weight;

/// Snapshots buffered per subscriber before new ones are dropped for it.
pub const SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Default)]
struct Published {
    /// Generation allowed to publish; bumped whenever a worker is retired.
    generation: u64,
    latest: Option<SensorSnapshot>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<Published>,
    subscribers: Mutex<Vec<xch::Sender<SensorSnapshot>>>,
}

impl Shared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, Published> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invalidate the current worker. With `clear`, `latest()` falls back to idle.
    fn next_generation(&self, clear: bool) -> u64 {
        let mut state = self.lock_state();
        state.generation += 1;
        if clear {
            state.latest = None;
        }
        state.generation
    }

    /// Publish `snap` if `generation` is still current. Returns false for a
    /// superseded worker, which must then exit.
    fn publish(&self, generation: u64, snap: SensorSnapshot) -> bool {
        // Held across the fan-out so retirement cannot interleave with it.
        let mut state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        {
            let mut subs = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subs.retain(|tx| match tx.try_send(snap.clone()) {
                Ok(()) => true,
                Err(xch::TrySendError::Full(_)) => {
                    tracing::trace!(tick = snap.tick, "subscriber lagging, snapshot dropped");
                    true
                }
                Err(xch::TrySendError::Disconnected(_)) => false,
            });
        }
        state.latest = Some(snap);
        true
    }
}

struct Worker {
    cancelled: Arc<AtomicBool>,
    stop_tx: xch::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Signal the worker and detach it. A worker idle between ticks exits at
    /// once; one blocked in a fetch exits when the fetch returns, and its
    /// result is rejected by the generation check.
    fn cancel(mut self) {
        self.cancelled.store(true, Ordering::Release);
        // Wakes the worker out of its inter-tick wait.
        let _ = self.stop_tx.try_send(());
        match self.join_handle.take() {
            Some(handle) if handle.is_finished() => {
                if let Err(e) = handle.join() {
                    tracing::warn!(?e, "poller worker panicked");
                }
            }
            Some(_) => tracing::trace!("poller worker detached"),
            None => {}
        }
    }
}

pub struct SensorPoller<T, C> {
    transport: Arc<T>,
    clock: C,
    config: SensorConfig,
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl<T, C> SensorPoller<T, C>
where
    T: DeviceTransport + 'static,
    C: Clock + Clone + Send + 'static,
{
    fn idle(config: SensorConfig, transport: T, clock: C) -> Self {
        Self {
            transport: Arc::new(transport),
            clock,
            config,
            shared: Arc::new(Shared::default()),
            worker: None,
        }
    }

    /// Start polling `config`. With no URL wired the poller stays idle and
    /// no thread is spawned.
    pub fn spawn(config: SensorConfig, transport: T, clock: C) -> Self {
        let mut poller = Self::idle(config, transport, clock);
        poller.start_worker();
        poller
    }

    /// Like `spawn`, with a subscriber registered before the worker starts so
    /// the immediate first tick is never missed.
    pub fn spawn_with_subscriber(
        config: SensorConfig,
        transport: T,
        clock: C,
    ) -> (Self, xch::Receiver<SensorSnapshot>) {
        let mut poller = Self::idle(config, transport, clock);
        let rx = poller.subscribe();
        poller.start_worker();
        (poller, rx)
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// True while a worker thread is polling.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Replace the configuration. The previous worker is cancelled (never
    /// waited for) and the new one ticks immediately.
    /// An identical configuration leaves the running worker untouched.
    pub fn reconfigure(&mut self, config: SensorConfig) {
        if config == self.config && self.worker.is_some() == config.is_active() {
            return;
        }
        tracing::debug!(
            scale_url = config.scale_url.as_deref(),
            photocell_url = config.photocell_url.as_deref(),
            interval_ms = config.polling_interval.as_millis() as u64,
            "poller reconfigured"
        );
        if let Some(worker) = self.worker.take() {
            worker.cancel();
        }
        self.config = config;
        self.start_worker();
    }

    /// Cancel polling. The last snapshot stays readable.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.shared.next_generation(false);
            worker.cancel();
        }
    }

    /// Latest published snapshot, or the idle snapshot before the first tick.
    pub fn latest(&self) -> SensorSnapshot {
        self.shared
            .lock_state()
            .latest
            .clone()
            .unwrap_or_else(|| SensorSnapshot::idle(self.clock.wall()))
    }

    /// Receive every snapshot published from now on. Survives reconfiguration.
    pub fn subscribe(&self) -> xch::Receiver<SensorSnapshot> {
        let (tx, rx) = xch::bounded(SUBSCRIBER_CAPACITY);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn start_worker(&mut self) {
        let generation = self.shared.next_generation(true);
        if !self.config.is_active() {
            tracing::debug!("no sensor wired; poller idle");
            return;
        }

        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_clone = cancelled.clone();
        let shared = self.shared.clone();
        let transport = self.transport.clone();
        let clock = self.clock.clone();
        let config = self.config.clone();

        let join_handle = thread::spawn(move || {
            let period = config.polling_interval;
            let mut tick: u64 = 0;
            let mut prev: Option<SensorSnapshot> = None;
            loop {
                if cancelled_clone.load(Ordering::Acquire) {
                    tracing::debug!("poller worker received shutdown signal");
                    break;
                }

                let started = clock.now();
                let mut snap = poll_once(transport.as_ref(), &config, clock.wall());
                snap.tick = tick + 1;
                snap.generation = generation;
                let summary = snap.clone();

                // Results of a tick that outlived its configuration are stale.
                if !shared.publish(generation, snap) {
                    tracing::trace!(tick, "discarding tick completed after cancellation");
                    break;
                }
                tick += 1;
                log_transitions(prev.as_ref(), &summary);
                tracing::debug!(
                    tick,
                    weight = summary.weight.value,
                    status = %summary.weight.status,
                    photocell = summary.photocell_state.as_bit(),
                    scale_ok = summary.is_scale_connected,
                    photocell_ok = summary.is_photocell_connected,
                    "poll tick"
                );
                prev = Some(summary);

                let wait = period.saturating_sub(clock.now().saturating_duration_since(started));
                match stop_rx.recv_timeout(wait) {
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    // Stop signal, or the poller is gone.
                    Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("poller worker exiting");
        });

        self.worker = Some(Worker {
            cancelled,
            stop_tx,
            join_handle: Some(join_handle),
        });
    }
}

impl<T, C> Drop for SensorPoller<T, C> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.shared.next_generation(false);
            worker.cancel();
        }
    }
}

/// Run one poll cycle against `config` and build the resulting snapshot
/// (with `tick = 0`, `generation = 0`). Unwired sensors are not contacted.
pub fn poll_once<T>(transport: &T, config: &SensorConfig, now: SystemTime) -> SensorSnapshot
where
    T: DeviceTransport + ?Sized,
{
    let fetch = |url: &Option<String>| url.as_deref().map(|u| transport.get_text(u));

    let (scale, photocell) = match (&config.scale_url, &config.photocell_url) {
        (Some(_), Some(_)) => thread::scope(|s| {
            let scale = s.spawn(|| fetch(&config.scale_url));
            let photocell = fetch(&config.photocell_url);
            let scale = scale.join().unwrap_or_else(|_| {
                Some(Err(TransportError::Network("scale fetch panicked".into())))
            });
            (scale, photocell)
        }),
        _ => (fetch(&config.scale_url), fetch(&config.photocell_url)),
    };

    let (weight, scale_error) = weight_from(scale, now);
    let (photocell_state, is_photocell_connected, photocell_error) = photocell_from(photocell);

    SensorSnapshot {
        is_scale_connected: weight.status.has_value(),
        weight,
        photocell_state,
        is_photocell_connected,
        errors: SensorErrors {
            scale: scale_error,
            photocell: photocell_error,
        },
        tick: 0,
        generation: 0,
    }
}

fn weight_from(
    fetched: Option<Result<String, TransportError>>,
    now: SystemTime,
) -> (WeightReading, Option<String>) {
    match fetched {
        None => (WeightReading::disconnected(now), None),
        Some(Ok(body)) => {
            let parsed = parse_weight(&body);
            let reading = WeightReading {
                value: parsed.value,
                status: parsed.status,
                timestamp: now,
            };
            (reading, None)
        }
        Some(Err(e)) => (WeightReading::disconnected(now), Some(e.to_string())),
    }
}

fn photocell_from(
    fetched: Option<Result<String, TransportError>>,
) -> (PhotocellState, bool, Option<String>) {
    match fetched {
        None => (PhotocellState::Absent, false, None),
        Some(Ok(body)) => {
            let r = parse_photocell(&body);
            if r.is_error {
                (r.state, false, Some(INVALID_RESPONSE.to_string()))
            } else {
                (r.state, true, None)
            }
        }
        Some(Err(e)) => (PhotocellState::Absent, false, Some(e.to_string())),
    }
}

/// Connectivity changes are logged once per edge; steady failures stay at debug.
fn log_transitions(prev: Option<&SensorSnapshot>, next: &SensorSnapshot) {
    let was_scale = prev.is_some_and(|p| p.is_scale_connected);
    let was_cell = prev.is_some_and(|p| p.is_photocell_connected);
    match (was_scale, next.is_scale_connected) {
        (false, true) => tracing::info!("scale connected"),
        (true, false) => tracing::warn!(
            status = %next.weight.status,
            error = next.errors.scale.as_deref(),
            "scale lost"
        ),
        _ => {}
    }
    match (was_cell, next.is_photocell_connected) {
        (false, true) => tracing::info!("photocell connected"),
        (true, false) => tracing::warn!(
            error = next.errors.photocell.as_deref(),
            "photocell lost"
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::WeightStatus;
    use std::collections::HashMap;

    struct FixedTransport(HashMap<&'static str, Result<String, TransportError>>);

    impl DeviceTransport for FixedTransport {
        fn get_text(&self, url: &str) -> Result<String, TransportError> {
            self.0
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Network("unreachable".into())))
        }
    }

    fn cfg(scale: Option<&str>, cell: Option<&str>) -> SensorConfig {
        SensorConfig::new(scale.map(String::from), cell.map(String::from), 200)
    }

    #[test]
    fn parses_both_sensors_in_one_cycle() {
        let t = FixedTransport(HashMap::from([
            ("http://scale", Ok("s-12,5".to_string())),
            ("http://cell", Ok("1".to_string())),
        ]));
        let snap = poll_once(&t, &cfg(Some("http://scale"), Some("http://cell")), SystemTime::UNIX_EPOCH);
        assert_eq!(snap.weight.status, WeightStatus::Stable);
        assert!((snap.weight.value - 12.5).abs() < 1e-12);
        assert_eq!(snap.photocell_state, PhotocellState::Present);
        assert!(snap.is_scale_connected && snap.is_photocell_connected);
        assert_eq!(snap.errors, SensorErrors::default());
    }

    #[test]
    fn unparsable_weight_is_error_but_clears_transport_error() {
        let t = FixedTransport(HashMap::from([("http://scale", Ok("garbage".to_string()))]));
        let snap = poll_once(&t, &cfg(Some("http://scale"), None), SystemTime::UNIX_EPOCH);
        assert_eq!(snap.weight.status, WeightStatus::Error);
        assert!(!snap.is_scale_connected);
        assert_eq!(snap.errors.scale, None);
    }

    #[test]
    fn invalid_photocell_payload_is_reported() {
        let t = FixedTransport(HashMap::from([("http://cell", Ok("7".to_string()))]));
        let snap = poll_once(&t, &cfg(None, Some("http://cell")), SystemTime::UNIX_EPOCH);
        assert!(!snap.is_photocell_connected);
        assert_eq!(snap.errors.photocell.as_deref(), Some(INVALID_RESPONSE));
        assert_eq!(snap.weight.status, WeightStatus::Disconnected);
        assert_eq!(snap.errors.scale, None);
    }

    #[test]
    fn http_status_failure_carries_detail() {
        let t = FixedTransport(HashMap::from([(
            "http://scale",
            Err(TransportError::Status(503)),
        )]));
        let snap = poll_once(&t, &cfg(Some("http://scale"), None), SystemTime::UNIX_EPOCH);
        assert_eq!(snap.weight.status, WeightStatus::Disconnected);
        assert_eq!(snap.errors.scale.as_deref(), Some("HTTP 503"));
    }
}
