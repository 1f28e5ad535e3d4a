//! Command execution: config loading, transport selection, and the
//! monitor / probe / convert / self-check commands.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eyre::{Result, WrapErr};
use serde_json::json;
use weighline_config::{Config, ProductRow};
use weighline_core::{
    ClassifiedReading, LineError, LineEvents, LineMonitor, LineSettings, ProductTolerance,
    ProductionItem, SensorConfig, SensorPoller, SensorSnapshot, WeightStats, WeightUnit,
    find_product, format_weight, poll_once,
};
use weighline_devices::{HttpTransport, SimulatedTransport};
use weighline_traits::DeviceTransport;
use weighline_traits::clock::MonotonicClock;

use crate::cli::SIM_ENV;

/// How long the monitor loop waits for a snapshot before re-checking Ctrl-C.
const RECV_SLICE: Duration = Duration::from_millis(100);

const SIM_SCALE_URL: &str = "http://sim.local/scale";
const SIM_PHOTOCELL_URL: &str = "http://sim.local/photocell";

pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&text)
        .map_err(|e| LineError::Config(format!("{}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| LineError::Config(format!("{e:#}")))?;
    Ok(cfg)
}

/// Inline `[[products]]` followed by the CSV rows, validated as one catalog.
pub fn load_catalog(cfg: &Config, csv: Option<&Path>) -> Result<Vec<ProductTolerance>> {
    let mut rows: Vec<ProductRow> = cfg.products.clone();
    if let Some(path) = csv {
        let extra = weighline_config::load_products_csv(path)
            .map_err(|e| LineError::Config(format!("{e:#}")))?;
        rows.extend(extra);
    }
    weighline_config::validate_products(&rows)
        .map_err(|e| LineError::Config(format!("{e:#}")))?;
    Ok(rows.iter().map(ProductTolerance::from).collect())
}

fn sim_enabled() -> bool {
    std::env::var(SIM_ENV).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Sensor endpoints and the transport that serves them.
///
/// In simulation an unwired line gets both simulated sensors so the commands
/// have something to show.
fn select_transport(
    cfg: &Config,
    product: Option<&ProductTolerance>,
) -> Result<(SensorConfig, Box<dyn DeviceTransport>)> {
    let mut sensors = SensorConfig::from(&cfg.sensors);
    if sim_enabled() {
        if !sensors.is_active() {
            sensors.scale_url = Some(SIM_SCALE_URL.to_string());
            sensors.photocell_url = Some(SIM_PHOTOCELL_URL.to_string());
        }
        let nominal = product.map_or(1.0, |p| {
            weighline_core::convert_weight(p.target_weight, &p.unit, &cfg.line.weight_unit)
        });
        tracing::info!(nominal, unit = %cfg.line.weight_unit, "using simulated sensors");
        return Ok((sensors, Box::new(SimulatedTransport::new(nominal))));
    }
    for url in [&sensors.scale_url, &sensors.photocell_url].into_iter().flatten() {
        HttpTransport::check_url(url)?;
    }
    let timeout = cfg.http.request_timeout_ms.map(Duration::from_millis);
    Ok((sensors, Box::new(HttpTransport::new(timeout)?)))
}

fn unix_ms(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis())
}

fn connected(flag: bool) -> &'static str {
    if flag { "connected" } else { "disconnected" }
}

/// Prints captured pieces as they happen.
struct ConsoleEvents {
    json: bool,
}

impl LineEvents for ConsoleEvents {
    fn on_item_captured(&mut self, item: &ProductionItem) {
        let verdict = item.class.map_or("unjudged", |c| c.as_str());
        if self.json {
            println!(
                "{}",
                json!({
                    "event": "item",
                    "piece": item.piece_no,
                    "product": item.product_code,
                    "weight": item.weight,
                    "unit": item.unit,
                    "status": item.status.as_str(),
                    "class": item.class.map(|c| c.as_str()),
                    "ts_ms": unix_ms(item.timestamp),
                })
            );
        } else {
            println!(
                "piece #{}: {} {} [{}] {}",
                item.piece_no,
                format_weight(item.weight, &item.unit, None),
                item.unit,
                item.status,
                verdict
            );
        }
    }
}

fn print_tick(monitor: &LineMonitor<ConsoleEvents>, r: &ClassifiedReading, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "event": "tick",
                "tick": r.tick,
                "weight": r.weight,
                "unit": r.unit,
                "status": r.reading.status.as_str(),
                "class": r.class.map(|c| c.as_str()),
                "photocell": r.photocell_state.as_bit(),
                "scale_connected": r.is_scale_connected,
                "photocell_connected": r.is_photocell_connected,
            })
        );
    } else {
        println!(
            "tick {:>5}  {:>12}  {:<12}  cell={}  {}",
            r.tick,
            monitor.format(r),
            r.reading.status.as_str(),
            r.photocell_state.as_bit(),
            r.class.map_or("-", |c| c.as_str())
        );
    }
}

fn print_summary(stats: &WeightStats, pieces: u64, unit: &str, json: bool) {
    let fmt = |v: Option<f64>| v.map(|x| format_weight(x, unit, None));
    if json {
        println!(
            "{}",
            json!({
                "event": "summary",
                "pieces": pieces,
                "captured": stats.total(),
                "ok": stats.ok,
                "underweight": stats.underweight,
                "overweight": stats.overweight,
                "unjudged": stats.unjudged,
                "min": stats.min(),
                "max": stats.max(),
                "mean": stats.mean(),
                "unit": unit,
                "pass_rate": stats.pass_rate(),
            })
        );
        return;
    }
    println!("pieces: {pieces}");
    println!(
        "ok: {}  underweight: {}  overweight: {}  unjudged: {}",
        stats.ok, stats.underweight, stats.overweight, stats.unjudged
    );
    if let (Some(min), Some(max), Some(mean)) =
        (fmt(stats.min()), fmt(stats.max()), fmt(stats.mean()))
    {
        println!("min/mean/max: {min} / {mean} / {max} {unit}");
    }
    if let Some(rate) = stats.pass_rate() {
        println!("pass rate: {:.1}%", rate * 100.0);
    }
}

pub fn run_monitor(
    cfg: &Config,
    catalog: &[ProductTolerance],
    product: Option<&str>,
    ticks: Option<u64>,
    interval_ms: Option<u64>,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let product = product.map(|code| find_product(catalog, code)).transpose()?;
    let settings = LineSettings::from(&cfg.line);
    let (mut sensors, transport) = select_transport(cfg, product)?;
    if let Some(ms) = interval_ms {
        sensors = SensorConfig::new(sensors.scale_url, sensors.photocell_url, ms);
    }
    if !sensors.is_active() {
        return Err(LineError::State("no sensor is wired to this line".to_string()).into());
    }

    tracing::info!(
        line = %settings.name,
        product = product.map(|p| p.code.as_str()),
        interval_ms = sensors.polling_interval.as_millis() as u64,
        "monitor start"
    );
    let unit = product.map_or_else(|| settings.weight_unit.clone(), |p| p.unit.clone());
    let mut monitor = LineMonitor::new(settings, product.cloned(), ConsoleEvents { json });
    let (poller, rx) =
        SensorPoller::spawn_with_subscriber(sensors, transport, MonotonicClock::new());

    let mut seen = 0u64;
    while !shutdown.load(Ordering::Relaxed) && ticks.is_none_or(|n| seen < n) {
        let snap: SensorSnapshot = match rx.recv_timeout(RECV_SLICE) {
            Ok(s) => s,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };
        if let Some(r) = monitor.ingest(&snap) {
            seen += 1;
            print_tick(&monitor, &r, json);
        }
    }
    drop(poller);
    tracing::info!(ticks = seen, pieces = monitor.pieces(), "monitor stop");
    print_summary(monitor.stats(), monitor.pieces(), &unit, json);
    Ok(())
}

pub fn run_probe(cfg: &Config, json: bool) -> Result<()> {
    let (sensors, transport) = select_transport(cfg, None)?;
    let snap = poll_once(&*transport, &sensors, SystemTime::now());
    let unit = &cfg.line.weight_unit;
    let value = format_weight(snap.weight.value, unit, cfg.line.weight_precision);
    if json {
        println!(
            "{}",
            json!({
                "scale_url": sensors.scale_url,
                "photocell_url": sensors.photocell_url,
                "weight": snap.weight.value,
                "unit": unit,
                "status": snap.weight.status.as_str(),
                "photocell": snap.photocell_state.as_bit(),
                "scale_connected": snap.is_scale_connected,
                "photocell_connected": snap.is_photocell_connected,
                "errors": {
                    "scale": snap.errors.scale,
                    "photocell": snap.errors.photocell,
                },
            })
        );
        return Ok(());
    }
    match &sensors.scale_url {
        Some(url) => println!(
            "scale     {url}: {value} {unit} [{}] ({})",
            snap.weight.status,
            connected(snap.is_scale_connected)
        ),
        None => println!("scale     not wired"),
    }
    match &sensors.photocell_url {
        Some(url) => println!(
            "photocell {url}: {} ({})",
            snap.photocell_state.as_bit(),
            connected(snap.is_photocell_connected)
        ),
        None => println!("photocell not wired"),
    }
    for err in [&snap.errors.scale, &snap.errors.photocell].into_iter().flatten() {
        println!("error: {err}");
    }
    Ok(())
}

pub fn run_convert(
    value: f64,
    from: &str,
    to: &str,
    precision: Option<usize>,
    json: bool,
) -> Result<()> {
    let from_unit: WeightUnit = from.parse()?;
    let to_unit: WeightUnit = to.parse()?;
    let converted = from_unit.convert(value, to_unit);
    let text = format_weight(converted, to_unit.symbol(), precision);
    if json {
        println!(
            "{}",
            json!({ "value": converted, "unit": to_unit.symbol(), "text": text })
        );
    } else {
        println!("{text} {}", to_unit.symbol());
    }
    Ok(())
}

pub fn run_self_check(cfg: &Config, catalog: &[ProductTolerance], json: bool) -> Result<()> {
    for url in [&cfg.sensors.scale_url, &cfg.sensors.photocell_url]
        .into_iter()
        .flatten()
    {
        HttpTransport::check_url(url)?;
    }
    let codes: Vec<&str> = catalog.iter().map(|p| p.code.as_str()).collect();
    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "line": cfg.line.name,
                "weight_unit": cfg.line.weight_unit,
                "scale_url": cfg.sensors.scale_url,
                "photocell_url": cfg.sensors.photocell_url,
                "polling_interval_ms": cfg.sensors.polling_interval_ms,
                "products": codes,
            })
        );
        return Ok(());
    }
    let wired = |u: &Option<String>| u.clone().unwrap_or_else(|| "not wired".to_string());
    println!("OK: line {} ({})", cfg.line.name, cfg.line.weight_unit);
    println!("scale:     {}", wired(&cfg.sensors.scale_url));
    println!("photocell: {}", wired(&cfg.sensors.photocell_url));
    println!("interval:  {} ms", cfg.sensors.polling_interval_ms);
    println!("products:  {} [{}]", codes.len(), codes.join(", "));
    if cfg.is_unwired() {
        println!("note: no sensor wired; monitor will refuse to start");
    }
    Ok(())
}
