//! Mass unit conversion through a gram pivot.
//!
//! Unknown unit symbols never fail: the value passes through unchanged and a
//! warning is logged, so a cosmetic unit mismatch cannot block a line display.

use std::fmt;
use std::str::FromStr;

use crate::error::LineError;

/// Supported mass units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightUnit {
    Milligram,
    Gram,
    Kilogram,
    Pound,
    Ounce,
}

impl WeightUnit {
    pub const ALL: [WeightUnit; 5] = [
        WeightUnit::Milligram,
        WeightUnit::Gram,
        WeightUnit::Kilogram,
        WeightUnit::Pound,
        WeightUnit::Ounce,
    ];

    /// Multiplicative factor from this unit to grams.
    #[inline]
    pub const fn grams_per_unit(self) -> f64 {
        match self {
            WeightUnit::Milligram => 0.001,
            WeightUnit::Gram => 1.0,
            WeightUnit::Kilogram => 1000.0,
            WeightUnit::Pound => 453.592,
            WeightUnit::Ounce => 28.3495,
        }
    }

    /// Decimal places used when no explicit precision is configured.
    #[inline]
    pub const fn default_precision(self) -> usize {
        match self {
            WeightUnit::Kilogram | WeightUnit::Pound => 3,
            WeightUnit::Gram | WeightUnit::Ounce => 1,
            WeightUnit::Milligram => 0,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            WeightUnit::Milligram => "mg",
            WeightUnit::Gram => "g",
            WeightUnit::Kilogram => "kg",
            WeightUnit::Pound => "lb",
            WeightUnit::Ounce => "oz",
        }
    }

    /// Convert `value` expressed in `self` into `to`.
    #[inline]
    pub fn convert(self, value: f64, to: WeightUnit) -> f64 {
        if self == to {
            return value;
        }
        value * self.grams_per_unit() / to.grams_per_unit()
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for WeightUnit {
    type Err = LineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sym = s.trim();
        WeightUnit::ALL
            .into_iter()
            .find(|u| u.symbol().eq_ignore_ascii_case(sym))
            .ok_or_else(|| LineError::UnknownUnit(s.to_string()))
    }
}

/// Convert a weight between unit symbols.
///
/// Identical symbols short-circuit to `value` (no float drift). If either
/// symbol is unknown the value is returned unchanged and a warning is logged.
pub fn convert_weight(value: f64, from: &str, to: &str) -> f64 {
    if from == to {
        return value;
    }
    match (from.parse::<WeightUnit>(), to.parse::<WeightUnit>()) {
        (Ok(f), Ok(t)) => f.convert(value, t),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(from, to, error = %e, "weight conversion skipped");
            value
        }
    }
}

/// Default display precision for a unit symbol; unknown symbols get 2.
pub fn default_precision(unit: &str) -> usize {
    unit.parse::<WeightUnit>()
        .map(WeightUnit::default_precision)
        .unwrap_or(2)
}

/// Fixed-point rendering with an explicit precision or the unit default.
pub fn format_weight(value: f64, unit: &str, precision: Option<usize>) -> String {
    let p = precision.unwrap_or_else(|| default_precision(unit));
    format!("{value:.p$}")
}
