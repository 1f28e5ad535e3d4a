//! Human-readable error descriptions and structured JSON error formatting.

use weighline_core::LineError;
use weighline_devices::error::DeviceError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(le) = err.downcast_ref::<LineError>() {
        return match le {
            LineError::UnknownUnit(u) => format!(
                "What happened: Unknown weight unit {u:?}.\nLikely causes: Typo in the unit symbol.\nHow to fix: Use one of g, kg, lb, oz, mg."
            ),
            LineError::UnknownProduct(code) => format!(
                "What happened: Unknown product {code:?}.\nLikely causes: The code is not in [[products]] or the --products CSV.\nHow to fix: Run `weighline self-check` to list the loaded catalog, then pass an existing code."
            ),
            LineError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or product CSV.\nHow to fix: Edit the config file, then rerun. See etc/weighline.toml for a sample."
            ),
            LineError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The line has no scale_url and no photocell_url.\nHow to fix: Wire at least one sensor in [sensors], or set {}=1 for a simulated line.",
                crate::cli::SIM_ENV
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DeviceError>() {
        return match de {
            DeviceError::InvalidUrl { url, reason } => format!(
                "What happened: Device URL {url:?} cannot be used ({reason}).\nLikely causes: Missing host or unsupported scheme.\nHow to fix: Use http://host[:port]/path in [sensors]."
            ),
            DeviceError::Client(msg) => format!(
                "What happened: HTTP client setup failed ({msg}).\nLikely causes: TLS backend could not initialize.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    // String-based heuristics for errors coming from I/O
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing to a readable TOML file. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 config, 4 unknown product/unit, 5 device setup, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(le) = err.downcast_ref::<LineError>() {
        return match le {
            LineError::Config(_) | LineError::State(_) => 3,
            LineError::UnknownProduct(_) | LineError::UnknownUnit(_) => 4,
        };
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return 5;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(le) = err.downcast_ref::<LineError>() {
        return match le {
            LineError::UnknownUnit(_) => "UnknownUnit",
            LineError::UnknownProduct(_) => "UnknownProduct",
            LineError::Config(_) => "Config",
            LineError::State(_) => "State",
        };
    }
    if err.downcast_ref::<DeviceError>().is_some() {
        return "Device";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
