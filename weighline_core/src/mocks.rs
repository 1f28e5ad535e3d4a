//! Test and helper mocks for weighline_core

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use weighline_traits::{DeviceTransport, TransportError};

/// Transport answering from a per-URL table and recording every request.
/// URLs without an entry fail like a refused connection.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    responses: Mutex<HashMap<String, Result<String, TransportError>>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the answer for `url`.
    pub fn respond(&self, url: &str, response: Result<&str, TransportError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), response.map(str::to_string));
    }

    /// Number of requests issued to `url` so far.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl DeviceTransport for RecordingTransport {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Network("connection refused".into())))
    }
}
