//! Pass/fail classification of a reading against a product tolerance window.

use std::fmt;

use crate::reading::{WeightReading, WeightStatus};
use crate::units::convert_weight;

/// Tolerance window of the product currently running on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTolerance {
    pub code: String,
    pub name: String,
    pub target_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Unit symbol the window is expressed in
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightClass {
    Ok,
    Underweight,
    Overweight,
}

impl WeightClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            WeightClass::Ok => "ok",
            WeightClass::Underweight => "underweight",
            WeightClass::Overweight => "overweight",
        }
    }

    #[inline]
    pub const fn is_pass(self) -> bool {
        matches!(self, WeightClass::Ok)
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a value already expressed in the product's unit.
///
/// Only stable readings are judged; bounds are inclusive.
pub fn classify(
    value: f64,
    status: WeightStatus,
    product: Option<&ProductTolerance>,
) -> Option<WeightClass> {
    let product = product?;
    if status != WeightStatus::Stable {
        return None;
    }
    if value < product.min_weight {
        Some(WeightClass::Underweight)
    } else if value > product.max_weight {
        Some(WeightClass::Overweight)
    } else {
        Some(WeightClass::Ok)
    }
}

/// Convert a reading from the line unit into the product unit, then classify.
/// Returns the converted value alongside the verdict.
pub fn classify_reading(
    reading: &WeightReading,
    reading_unit: &str,
    product: Option<&ProductTolerance>,
) -> (f64, Option<WeightClass>) {
    let converted = match product {
        Some(p) => convert_weight(reading.value, reading_unit, &p.unit),
        None => reading.value,
    };
    (converted, classify(converted, reading.status, product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::SystemTime;

    fn window() -> ProductTolerance {
        ProductTolerance {
            code: "BRD-250".into(),
            name: "Rye loaf".into(),
            target_weight: 250.0,
            min_weight: 245.0,
            max_weight: 255.0,
            unit: "g".into(),
        }
    }

    #[rstest]
    #[case(250.0, Some(WeightClass::Ok))]
    #[case(245.0, Some(WeightClass::Ok))]
    #[case(255.0, Some(WeightClass::Ok))]
    #[case(244.999, Some(WeightClass::Underweight))]
    #[case(255.001, Some(WeightClass::Overweight))]
    fn stable_readings_are_judged(#[case] v: f64, #[case] want: Option<WeightClass>) {
        assert_eq!(classify(v, WeightStatus::Stable, Some(&window())), want);
    }

    #[rstest]
    #[case(WeightStatus::Unstable)]
    #[case(WeightStatus::Error)]
    #[case(WeightStatus::Disconnected)]
    fn non_stable_readings_are_never_judged(#[case] status: WeightStatus) {
        assert_eq!(classify(250.0, status, Some(&window())), None);
        assert_eq!(classify(1.0, status, Some(&window())), None);
    }

    #[test]
    fn no_product_means_no_verdict() {
        assert_eq!(classify(250.0, WeightStatus::Stable, None), None);
    }

    #[test]
    fn reading_is_converted_into_product_unit() {
        let r = WeightReading {
            value: 0.2504,
            status: WeightStatus::Stable,
            timestamp: SystemTime::UNIX_EPOCH,
        };
        let (g, class) = classify_reading(&r, "kg", Some(&window()));
        assert!((g - 250.4).abs() < 1e-9);
        assert_eq!(class, Some(WeightClass::Ok));

        let light = WeightReading { value: 0.2, ..r };
        assert_eq!(
            classify_reading(&light, "kg", Some(&window())).1,
            Some(WeightClass::Underweight)
        );
    }
}
