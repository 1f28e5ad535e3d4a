#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Sensor pipeline of a weighing production line (transport-agnostic).
//!
//! All device I/O goes through `weighline_traits::DeviceTransport`.
//!
//! ## Architecture
//!
//! - **Units**: mass conversion through a gram pivot (`units`)
//! - **Parsing**: scale text (`weight_parser`) and photocell text (`photocell`)
//! - **Polling**: cancellable background worker publishing snapshots (`poller`)
//! - **Classification**: ok / underweight / overweight verdicts (`classify`)
//! - **Monitoring**: piece capture and running statistics (`monitor`, `stats`)

pub mod classify;
pub mod config;
pub mod conversions;
pub mod error;
pub mod mocks;
pub mod monitor;
pub mod photocell;
pub mod poller;
pub mod reading;
pub mod stats;
pub mod units;
pub mod weight_parser;

pub use classify::{ProductTolerance, WeightClass, classify, classify_reading};
pub use config::{LineSettings, SensorConfig};
pub use error::{LineError, Result};
pub use monitor::{
    ClassifiedReading, LineEvents, LineMonitor, NoopEvents, PieceCounter, ProductionItem,
};
pub use photocell::{PhotocellReading, parse_photocell};
pub use poller::{SensorPoller, poll_once};
pub use reading::{PhotocellState, SensorErrors, SensorSnapshot, WeightReading, WeightStatus};
pub use stats::WeightStats;
pub use units::{WeightUnit, convert_weight, default_precision, format_weight};
pub use weight_parser::{ParsedWeight, parse_weight};

/// Look up a product by code (case-insensitive) in a catalog.
pub fn find_product<'a>(
    catalog: &'a [ProductTolerance],
    code: &str,
) -> std::result::Result<&'a ProductTolerance, LineError> {
    catalog
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(code.trim()))
        .ok_or_else(|| LineError::UnknownProduct(code.to_string()))
}
