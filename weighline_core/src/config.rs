//! Runtime configuration types for the poller and the line monitor.
//!
//! These are separate from the TOML-deserialized config in `weighline_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

use crate::units::WeightUnit;

/// Default poll period (ms) used by the operator UI.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 200;

/// Which device endpoints to poll, and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    /// `None` means no scale is wired to this line; it is never polled.
    pub scale_url: Option<String>,
    /// `None` means no photocell is wired to this line; it is never polled.
    pub photocell_url: Option<String>,
    /// Period between tick starts. Clamped to at least 1 ms.
    pub polling_interval: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            scale_url: None,
            photocell_url: None,
            polling_interval: Duration::from_millis(DEFAULT_POLLING_INTERVAL_MS),
        }
    }
}

impl SensorConfig {
    pub fn new(
        scale_url: Option<String>,
        photocell_url: Option<String>,
        polling_interval_ms: u64,
    ) -> Self {
        Self {
            scale_url,
            photocell_url,
            polling_interval: Duration::from_millis(polling_interval_ms.max(1)),
        }
    }

    /// True when at least one sensor is wired and a worker must run.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.scale_url.is_some() || self.photocell_url.is_some()
    }
}

/// Display/conversion settings of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    pub name: String,
    /// Unit symbol the scale reports in.
    pub weight_unit: String,
    /// Explicit display precision; `None` uses the unit's default.
    pub weight_precision: Option<usize>,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            name: "line-1".to_string(),
            weight_unit: WeightUnit::Kilogram.symbol().to_string(),
            weight_precision: None,
        }
    }
}
