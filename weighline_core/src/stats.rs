//! Running pass/fail statistics over captured items.

use crate::classify::WeightClass;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightStats {
    pub ok: u64,
    pub underweight: u64,
    pub overweight: u64,
    /// Items captured without a verdict (unstable reading or no product bound).
    pub unjudged: u64,
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
    judged_weights: u64,
}

impl WeightStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, weight: f64, class: Option<WeightClass>) {
        let Some(class) = class else {
            self.unjudged += 1;
            return;
        };
        match class {
            WeightClass::Ok => self.ok += 1,
            WeightClass::Underweight => self.underweight += 1,
            WeightClass::Overweight => self.overweight += 1,
        }
        if weight.is_finite() {
            self.min = Some(self.min.map_or(weight, |m| m.min(weight)));
            self.max = Some(self.max.map_or(weight, |m| m.max(weight)));
            self.sum += weight;
            self.judged_weights += 1;
        }
    }

    /// Items with a verdict.
    pub fn judged(&self) -> u64 {
        self.ok + self.underweight + self.overweight
    }

    pub fn total(&self) -> u64 {
        self.judged() + self.unjudged
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        (self.judged_weights > 0).then(|| self.sum / self.judged_weights as f64)
    }

    /// Fraction of judged items within tolerance, in [0, 1].
    pub fn pass_rate(&self) -> Option<f64> {
        let judged = self.judged();
        (judged > 0).then(|| self.ok as f64 / judged as f64)
    }
}
