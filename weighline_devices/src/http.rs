//! HTTP transport for scale and photocell endpoints.
//!
//! Devices answer a plain GET with a short text body. Non-2xx answers and
//! network failures both surface as `TransportError`; the body itself is
//! never interpreted here.

use std::time::Duration;

use reqwest::blocking::Client;
use weighline_traits::{DeviceTransport, TransportError};

use crate::error::{DeviceError, Result};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client. `timeout = None` keeps reqwest's default request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| DeviceError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Reject URLs the client could never fetch (bad syntax, no host).
    pub fn check_url(url: &str) -> Result<()> {
        let invalid = |reason: String| DeviceError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let parsed = reqwest::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(())
    }
}

impl DeviceTransport for HttpTransport {
    fn get_text(&self, url: &str) -> std::result::Result<String, TransportError> {
        let resp = self.client.get(url).send().map_err(|e| {
            tracing::debug!(url, error = %e, "device request failed");
            TransportError::Network(describe(&e))
        })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "device answered non-2xx");
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.text()
            .map_err(|e| TransportError::Network(format!("read body: {e}")))
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {e}")
    } else if e.is_connect() {
        format!("connect: {e}")
    } else {
        e.to_string()
    }
}
