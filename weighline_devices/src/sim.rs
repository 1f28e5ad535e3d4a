//! Scripted line simulation for demos and tests without devices.
//!
//! Every URL gets its own call counter and walks the same cycle, so a scale
//! and a photocell polled once per tick stay in phase:
//!
//! | call in cycle | photocell | scale                      |
//! |---------------|-----------|----------------------------|
//! | 0..=3         | `0`       | `s-0.000` (empty)          |
//! | 4..=5         | `1`       | `i-<partial>` (settling)   |
//! | 6..=8         | `1`       | `s-<piece weight>`         |
//! | 9             | `0`       | `s-0.000`                  |
//!
//! URLs containing "cell" or "photo" answer as a photocell; anything else
//! answers as a scale.
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use weighline_traits::{DeviceTransport, TransportError};

const CYCLE: u64 = 10;

/// Deterministic per-piece deviations from the nominal weight (fraction of nominal).
const DEVIATIONS: [f64; 7] = [0.0, 0.012, -0.008, 0.031, -0.026, 0.004, -0.002];

pub struct SimulatedTransport {
    nominal: f64,
    fault_every: Option<u64>,
    calls: Mutex<HashMap<String, u64>>,
}

impl SimulatedTransport {
    /// `nominal` is the target piece weight in the line unit.
    pub fn new(nominal: f64) -> Self {
        Self {
            nominal,
            fault_every: None,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Make every `n`-th request to any URL fail with HTTP 503.
    pub fn with_fault_every(mut self, n: u64) -> Self {
        self.fault_every = (n > 0).then_some(n);
        self
    }

    fn next_call(&self, url: &str) -> u64 {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        let n = calls.entry(url.to_string()).or_insert(0);
        let current = *n;
        *n += 1;
        current
    }

    fn piece_weight(&self, piece: u64) -> f64 {
        let dev = DEVIATIONS[(piece % DEVIATIONS.len() as u64) as usize];
        self.nominal * (1.0 + dev)
    }
}

fn is_photocell(url: &str) -> bool {
    let u = url.to_ascii_lowercase();
    u.contains("cell") || u.contains("photo")
}

impl DeviceTransport for SimulatedTransport {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let call = self.next_call(url);
        if let Some(n) = self.fault_every
            && (call + 1) % n == 0
        {
            return Err(TransportError::Status(503));
        }
        let phase = call % CYCLE;
        let piece = call / CYCLE;

        if is_photocell(url) {
            let present = (4..=8).contains(&phase);
            return Ok(if present { "1" } else { "0" }.to_string());
        }
        let body = match phase {
            4..=5 => format!("i-{:.3}", self.piece_weight(piece) * 0.6),
            6..=8 => format!("s-{:.3}", self.piece_weight(piece)),
            _ => "s-0.000".to_string(),
        };
        Ok(body)
    }
}
