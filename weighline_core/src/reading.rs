//! Reading types published by the poller.

use std::fmt;
use std::time::SystemTime;

/// Stability/validity of a scale reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightStatus {
    /// Device reports a settled value.
    Stable,
    /// Device reports a moving value.
    Unstable,
    /// Device answered but the payload was unusable.
    Error,
    /// The poller could not reach the device, or no scale is wired.
    Disconnected,
}

impl WeightStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            WeightStatus::Stable => "stable",
            WeightStatus::Unstable => "unstable",
            WeightStatus::Error => "error",
            WeightStatus::Disconnected => "disconnected",
        }
    }

    /// Readings with a usable value (stable or unstable).
    #[inline]
    pub const fn has_value(self) -> bool {
        matches!(self, WeightStatus::Stable | WeightStatus::Unstable)
    }
}

impl fmt::Display for WeightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scale sample. Error and disconnected readings carry `value = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightReading {
    /// Value in the line's configured unit
    pub value: f64,
    pub status: WeightStatus,
    pub timestamp: SystemTime,
}

impl WeightReading {
    pub fn disconnected(timestamp: SystemTime) -> Self {
        Self {
            value: 0.0,
            status: WeightStatus::Disconnected,
            timestamp,
        }
    }
}

/// Binary presence signal from the photocell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhotocellState {
    #[default]
    Absent = 0,
    Present = 1,
}

impl PhotocellState {
    #[inline]
    pub const fn as_bit(self) -> u8 {
        self as u8
    }
}

/// Last failure detail per sensor; `None` means the last tick was clean.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorErrors {
    pub scale: Option<String>,
    pub photocell: Option<String>,
}

/// Everything the poller knows after one tick. Published as a whole so the
/// weight value and its status always come from the same poll.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub weight: WeightReading,
    pub photocell_state: PhotocellState,
    pub is_scale_connected: bool,
    pub is_photocell_connected: bool,
    pub errors: SensorErrors,
    /// Number of completed ticks for the current configuration (0 = none yet).
    pub tick: u64,
    /// Worker generation that produced the snapshot; changes on every
    /// reconfiguration, where `tick` restarts at 1.
    pub generation: u64,
}

impl SensorSnapshot {
    /// Steady state of a line with no tick applied (or no sensors wired).
    pub fn idle(timestamp: SystemTime) -> Self {
        Self {
            weight: WeightReading::disconnected(timestamp),
            photocell_state: PhotocellState::Absent,
            is_scale_connected: false,
            is_photocell_connected: false,
            errors: SensorErrors::default(),
            tick: 0,
            generation: 0,
        }
    }
}
