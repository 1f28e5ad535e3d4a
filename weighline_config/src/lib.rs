#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and product catalog parsing for a monitored production line.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The product catalog can live inline (`[[products]]`) or in a CSV file
//!   with a strict header; both produce `ProductRow`s.
use serde::Deserialize;
use serde::de::Deserializer;
use std::collections::HashSet;

/// Mass unit symbols understood by the conversion layer (case-insensitive).
pub const KNOWN_WEIGHT_UNITS: [&str; 5] = ["g", "kg", "lb", "oz", "mg"];

/// Default poll period used by the operator UI.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 200;

/// Product catalog schema.
///
/// Expected CSV headers:
/// code,name,target_weight,min_weight,max_weight,unit
///
/// Example:
/// code,name,target_weight,min_weight,max_weight,unit
/// BRD-250,Rye loaf,250,245,255,g
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProductRow {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub target_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LineCfg {
    /// Display name of the production line
    pub name: String,
    /// Unit the scale reports in (g, kg, lb, oz, mg)
    pub weight_unit: String,
    /// Decimal places for display; falls back to the unit's default precision
    pub weight_precision: Option<usize>,
}

impl Default for LineCfg {
    fn default() -> Self {
        Self {
            name: "line-1".to_string(),
            weight_unit: "kg".to_string(),
            weight_precision: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorsCfg {
    /// Scale endpoint; absent or empty means no scale is wired to the line
    #[serde(deserialize_with = "de_opt_url")]
    pub scale_url: Option<String>,
    /// Photocell endpoint; absent or empty means no photocell is wired
    #[serde(deserialize_with = "de_opt_url")]
    pub photocell_url: Option<String>,
    /// Poll period in milliseconds. Also accepts alias "poll_ms".
    #[serde(alias = "poll_ms")]
    pub polling_interval_ms: u64,
}

impl Default for SensorsCfg {
    fn default() -> Self {
        Self {
            scale_url: None,
            photocell_url: None,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct HttpCfg {
    /// Per-request timeout (ms). Absent keeps the HTTP client's default.
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub line: LineCfg,
    #[serde(default)]
    pub sensors: SensorsCfg,
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub logging: Logging,
    /// Inline product catalog; merged with `--products` CSV by the CLI.
    #[serde(default)]
    pub products: Vec<ProductRow>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Treat empty or whitespace-only URLs as "not wired".
fn de_opt_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn is_known_unit(unit: &str) -> bool {
    KNOWN_WEIGHT_UNITS
        .iter()
        .any(|u| u.eq_ignore_ascii_case(unit.trim()))
}

fn validate_url(key: &str, url: &str) -> eyre::Result<()> {
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        eyre::bail!("{key} must be an http:// or https:// URL, got {url:?}");
    }
    Ok(())
}

impl ProductRow {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.code.trim().is_empty() {
            eyre::bail!("product code must not be empty");
        }
        let code = &self.code;
        for (name, v) in [
            ("target_weight", self.target_weight),
            ("min_weight", self.min_weight),
            ("max_weight", self.max_weight),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("product {code}: {name} must be a finite value >= 0");
            }
        }
        if self.min_weight > self.max_weight {
            eyre::bail!("product {code}: min_weight must be <= max_weight");
        }
        if self.target_weight < self.min_weight || self.target_weight > self.max_weight {
            eyre::bail!("product {code}: target_weight must lie within [min_weight, max_weight]");
        }
        if !is_known_unit(&self.unit) {
            eyre::bail!(
                "product {code}: unknown unit {:?} (expected one of {})",
                self.unit,
                KNOWN_WEIGHT_UNITS.join(", ")
            );
        }
        Ok(())
    }
}

/// Validate a catalog: every row valid, codes unique ignoring ASCII case
/// (products are looked up case-insensitively).
pub fn validate_products(rows: &[ProductRow]) -> eyre::Result<()> {
    let mut seen = HashSet::new();
    for row in rows {
        row.validate()?;
        if !seen.insert(row.code.trim().to_ascii_lowercase()) {
            eyre::bail!("duplicate product code {:?}", row.code);
        }
    }
    Ok(())
}

pub fn load_products_csv(path: &std::path::Path) -> eyre::Result<Vec<ProductRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open product CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = [
        "code",
        "name",
        "target_weight",
        "min_weight",
        "max_weight",
        "unit",
    ];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "product CSV must have headers '{}', got: {}",
            expected.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProductRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    validate_products(&rows)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Line
        if self.line.name.trim().is_empty() {
            eyre::bail!("line.name must not be empty");
        }
        if !is_known_unit(&self.line.weight_unit) {
            eyre::bail!(
                "line.weight_unit {:?} is not a known unit (expected one of {})",
                self.line.weight_unit,
                KNOWN_WEIGHT_UNITS.join(", ")
            );
        }
        if let Some(p) = self.line.weight_precision
            && p > 6
        {
            eyre::bail!("line.weight_precision must be in [0, 6]");
        }

        // Sensors
        if self.sensors.polling_interval_ms == 0 {
            eyre::bail!("sensors.polling_interval_ms must be >= 1");
        }
        if self.sensors.polling_interval_ms > 60 * 60 * 1000 {
            eyre::bail!("sensors.polling_interval_ms is unreasonably large (>1h)");
        }
        if let Some(url) = &self.sensors.scale_url {
            validate_url("sensors.scale_url", url)?;
        }
        if let Some(url) = &self.sensors.photocell_url {
            validate_url("sensors.photocell_url", url)?;
        }

        // HTTP
        if self.http.request_timeout_ms == Some(0) {
            eyre::bail!("http.request_timeout_ms must be >= 1 when set");
        }

        // Products
        validate_products(&self.products)?;

        Ok(())
    }

    /// True when neither sensor is wired; the poller stays idle.
    pub fn is_unwired(&self) -> bool {
        self.sensors.scale_url.is_none() && self.sensors.photocell_url.is_none()
    }
}
