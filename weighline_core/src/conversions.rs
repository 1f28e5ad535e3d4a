//! `From` implementations bridging `weighline_config` types to `weighline_core` types.

use crate::classify::ProductTolerance;
use crate::config::{LineSettings, SensorConfig};

// ── SensorConfig ─────────────────────────────────────────────────────────────

impl From<&weighline_config::SensorsCfg> for SensorConfig {
    fn from(c: &weighline_config::SensorsCfg) -> Self {
        Self::new(
            c.scale_url.clone(),
            c.photocell_url.clone(),
            c.polling_interval_ms,
        )
    }
}

// ── LineSettings ─────────────────────────────────────────────────────────────

impl From<&weighline_config::LineCfg> for LineSettings {
    fn from(c: &weighline_config::LineCfg) -> Self {
        Self {
            name: c.name.clone(),
            weight_unit: c.weight_unit.trim().to_string(),
            weight_precision: c.weight_precision,
        }
    }
}

// ── ProductTolerance ─────────────────────────────────────────────────────────

impl From<&weighline_config::ProductRow> for ProductTolerance {
    fn from(r: &weighline_config::ProductRow) -> Self {
        Self {
            code: r.code.clone(),
            name: r.name.clone(),
            target_weight: r.target_weight,
            min_weight: r.min_weight,
            max_weight: r.max_weight,
            unit: r.unit.trim().to_string(),
        }
    }
}
