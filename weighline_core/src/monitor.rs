//! Line monitor: turns poller snapshots into judged readings and captured
//! production items.
//!
//! Each snapshot is converted from the line unit into the bound product's
//! unit and classified. A photocell rising edge (absent → present) marks a
//! piece arriving on the scale. The piece is captured as a `ProductionItem`
//! on the first stable reading while it is present; if it leaves before the
//! scale settles, the last reading seen is captured without a verdict.

use std::time::SystemTime;

use crate::classify::{ProductTolerance, WeightClass, classify_reading};
use crate::config::LineSettings;
use crate::reading::{PhotocellState, SensorSnapshot, WeightReading, WeightStatus};
use crate::stats::WeightStats;
use crate::units::{default_precision, format_weight};

/// Side-effect channel for monitor results (display, feedback, persistence).
pub trait LineEvents {
    /// Called once per ingested snapshot.
    fn on_classified(&mut self, _reading: &ClassifiedReading) {}
    /// Called once per piece, when its weight is captured.
    fn on_item_captured(&mut self, _item: &ProductionItem) {}
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl LineEvents for NoopEvents {}

/// One snapshot after unit conversion and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedReading {
    pub tick: u64,
    /// Reading as the scale reported it, in the line unit
    pub reading: WeightReading,
    /// Reading expressed in `unit`
    pub weight: f64,
    /// Product unit when a product is bound, else the line unit
    pub unit: String,
    pub class: Option<WeightClass>,
    pub photocell_state: PhotocellState,
    pub is_scale_connected: bool,
    pub is_photocell_connected: bool,
}

/// Captured piece, handed to whatever persists production items.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionItem {
    /// 1-based piece number since the monitor started (or the product changed)
    pub piece_no: u64,
    pub product_code: Option<String>,
    pub weight: f64,
    pub unit: String,
    pub status: WeightStatus,
    pub class: Option<WeightClass>,
    pub timestamp: SystemTime,
}

/// Counts absent → present transitions of the photocell.
///
/// Ticks where the photocell was unreachable or answered garbage are ignored,
/// so a flapping connection cannot fabricate edges. The very first valid
/// observation only primes the counter.
#[derive(Debug, Default, Clone)]
pub struct PieceCounter {
    last: Option<PhotocellState>,
    count: u64,
}

impl PieceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tick; returns true on a rising edge.
    pub fn observe(&mut self, state: PhotocellState, valid: bool) -> bool {
        if !valid {
            return false;
        }
        let rising = self.last == Some(PhotocellState::Absent) && state == PhotocellState::Present;
        self.last = Some(state);
        if rising {
            self.count += 1;
        }
        rising
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct LineMonitor<E: LineEvents> {
    settings: LineSettings,
    product: Option<ProductTolerance>,
    counter: PieceCounter,
    stats: WeightStats,
    /// (generation, tick) of the last ingested snapshot
    last_tick: Option<(u64, u64)>,
    /// Piece on the scale waiting for a stable reading, with the latest reading seen
    pending: Option<(u64, ClassifiedReading)>,
    events: E,
}

impl<E: LineEvents> LineMonitor<E> {
    pub fn new(settings: LineSettings, product: Option<ProductTolerance>, events: E) -> Self {
        Self {
            settings,
            product,
            counter: PieceCounter::new(),
            stats: WeightStats::new(),
            last_tick: None,
            pending: None,
            events,
        }
    }

    pub fn settings(&self) -> &LineSettings {
        &self.settings
    }

    pub fn product(&self) -> Option<&ProductTolerance> {
        self.product.as_ref()
    }

    /// Bind another product (or none). Piece count and statistics restart.
    pub fn set_product(&mut self, product: Option<ProductTolerance>) {
        tracing::info!(
            product = product.as_ref().map(|p| p.code.as_str()),
            "product changed"
        );
        self.product = product;
        self.counter.reset();
        self.stats = WeightStats::new();
        self.pending = None;
    }

    pub fn stats(&self) -> &WeightStats {
        &self.stats
    }

    pub fn pieces(&self) -> u64 {
        self.counter.count()
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn into_events(self) -> E {
        self.events
    }

    /// Ingest one snapshot. A snapshot already ingested (same generation and
    /// tick) is ignored (returns `None`) so re-reading `latest()` cannot
    /// double count. A reconfigured poller restarts its ticks under a new
    /// generation, so its first tick is never mistaken for a repeat.
    pub fn ingest(&mut self, snap: &SensorSnapshot) -> Option<ClassifiedReading> {
        let key = (snap.generation, snap.tick);
        if snap.tick != 0 && self.last_tick == Some(key) {
            return None;
        }
        self.last_tick = Some(key);

        let (weight, class) = classify_reading(
            &snap.weight,
            &self.settings.weight_unit,
            self.product.as_ref(),
        );
        let unit = self
            .product
            .as_ref()
            .map_or_else(|| self.settings.weight_unit.clone(), |p| p.unit.clone());
        let classified = ClassifiedReading {
            tick: snap.tick,
            reading: snap.weight,
            weight,
            unit,
            class,
            photocell_state: snap.photocell_state,
            is_scale_connected: snap.is_scale_connected,
            is_photocell_connected: snap.is_photocell_connected,
        };
        self.events.on_classified(&classified);

        let valid_cell = snap.is_photocell_connected;
        if self.counter.observe(snap.photocell_state, valid_cell) {
            if let Some((piece_no, last)) = self.pending.take() {
                self.capture(piece_no, &last);
            }
            self.pending = Some((self.counter.count(), classified.clone()));
        }

        if let Some((piece_no, last)) = self.pending.take() {
            let left = valid_cell && snap.photocell_state == PhotocellState::Absent;
            if left {
                self.capture(piece_no, &last);
            } else if classified.reading.status == WeightStatus::Stable {
                self.capture(piece_no, &classified);
            } else {
                self.pending = Some((piece_no, classified.clone()));
            }
        }
        Some(classified)
    }

    fn capture(&mut self, piece_no: u64, r: &ClassifiedReading) {
        let item = ProductionItem {
            piece_no,
            product_code: self.product.as_ref().map(|p| p.code.clone()),
            weight: r.weight,
            unit: r.unit.clone(),
            status: r.reading.status,
            class: r.class,
            timestamp: r.reading.timestamp,
        };
        self.stats.record(item.weight, item.class);
        tracing::info!(
            piece = item.piece_no,
            weight = item.weight,
            unit = %item.unit,
            status = %item.status,
            class = item.class.map(WeightClass::as_str),
            "item captured"
        );
        self.events.on_item_captured(&item);
    }

    /// Render a classified weight with the configured precision.
    pub fn format(&self, r: &ClassifiedReading) -> String {
        let precision = if self.product.is_some() {
            Some(default_precision(&r.unit))
        } else {
            self.settings.weight_precision
        };
        format!("{} {}", format_weight(r.weight, &r.unit, precision), r.unit)
    }
}
