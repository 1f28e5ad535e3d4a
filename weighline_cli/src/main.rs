mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        // Only the panic/report hooks; errors are printed through `humanize`.
        let _ = color_eyre::install();
    }

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = if cli.cmd.needs_config() {
        Some(run::load_config(&cli.config)?)
    } else {
        None
    };
    init_tracing(&cli, cfg.as_ref().map(|c| &c.logging))?;

    match (&cli.cmd, cfg.as_ref()) {
        (
            Commands::Convert {
                value,
                from,
                to,
                precision,
            },
            _,
        ) => run::run_convert(*value, from, to, *precision, cli.json),
        (Commands::Probe, Some(cfg)) => run::run_probe(cfg, cli.json),
        (Commands::SelfCheck, Some(cfg)) => {
            let catalog = run::load_catalog(cfg, cli.products.as_deref())?;
            run::run_self_check(cfg, &catalog, cli.json)
        }
        (
            Commands::Monitor {
                product,
                ticks,
                interval_ms,
            },
            Some(cfg),
        ) => {
            let catalog = run::load_catalog(cfg, cli.products.as_deref())?;
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            run::run_monitor(
                cfg,
                &catalog,
                product.as_deref(),
                *ticks,
                *interval_ms,
                cli.json,
                shutdown,
            )
        }
        (_, None) => eyre::bail!("internal: command requires a loaded config"),
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console logs go to stderr so stdout stays parseable; an optional JSON
/// file sink comes from `[logging]`.
fn init_tracing(cli: &Cli, logging: Option<&weighline_config::Logging>) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .wrap_err_with(|| format!("invalid log level {:?}", cli.log_level))?;
    let console: BoxedLayer = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    if let Some(log) = logging
        && let Some(file) = log.file.as_deref()
    {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let appender = match log.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            "never" => tracing_appender::rolling::never(dir, name),
            other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = log.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(level)
            .wrap_err_with(|| format!("invalid logging.level {level:?}"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}
