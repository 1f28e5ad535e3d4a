//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Environment switch selecting the scripted simulation instead of HTTP.
pub const SIM_ENV: &str = "WEIGHLINE_SIM";

#[derive(Parser, Debug)]
#[command(name = "weighline", version, about = "Production line weight monitor")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/weighline.toml")]
    pub config: PathBuf,

    /// Optional product catalog CSV (strict header), merged with [[products]]
    #[arg(long, value_name = "FILE")]
    pub products: Option<PathBuf>,

    /// Emit JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the line sensors, classify readings and count pieces
    Monitor {
        /// Product code to judge readings against
        #[arg(long, value_name = "CODE")]
        product: Option<String>,
        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Override sensors.polling_interval_ms
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
    /// Run a single poll cycle and print the snapshot
    Probe,
    /// Convert a weight between units
    Convert {
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
        /// Source unit (g, kg, lb, oz, mg)
        #[arg(long)]
        from: String,
        /// Target unit (g, kg, lb, oz, mg)
        #[arg(long)]
        to: String,
        /// Decimal places (default: the target unit's precision)
        #[arg(long)]
        precision: Option<usize>,
    },
    /// Validate config and product catalog, report wired sensors
    SelfCheck,
}

impl Commands {
    /// Whether the command reads the config file at all.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Convert { .. })
    }
}
