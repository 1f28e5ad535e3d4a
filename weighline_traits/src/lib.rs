pub mod clock;

pub use clock::{Clock, MonotonicClock};

use thiserror::Error;

/// Failure to obtain a response body from a device endpoint.
///
/// Only transport-level problems live here; a body that arrived but cannot
/// be interpreted is classified by the parsers instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device answered with a non-2xx status code.
    #[error("HTTP {0}")]
    Status(u16),
    /// DNS, connect, read or timeout failure.
    #[error("{0}")]
    Network(String),
}

/// Plain-text GET against a device endpoint.
///
/// Implementations must be shareable across the poller's worker threads:
/// one tick may fetch the scale and the photocell concurrently.
pub trait DeviceTransport: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, TransportError>;
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for std::sync::Arc<T> {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        (**self).get_text(url)
    }
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for Box<T> {
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        (**self).get_text(url)
    }
}
