//! Scale response parsing.
//!
//! Scales on the floor speak two dialects, accepted without configuration:
//! - strict: `s-<value>` (stable) / `i-<value>` (unstable), comma or dot decimals
//! - free-form: a leading signed number, optionally followed by text that may
//!   hint at instability (`100.5 g`, `1234,5 unstable`, `87 instable`)
//!
//! Anything else (including explicit error words) is an `Error` reading.

use std::sync::LazyLock;

use regex::Regex;

use crate::reading::WeightStatus;

#[allow(clippy::expect_used)]
static STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([si])-(.+)$").expect("strict weight pattern"));

#[allow(clippy::expect_used)]
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+[.,]?\d*)").expect("leading number pattern"));

#[allow(clippy::expect_used)]
static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float prefix pattern")
});

/// Result of parsing one scale response. Never `Disconnected`: that status
/// belongs to the poller, which is the only one that knows the device was
/// unreachable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedWeight {
    pub value: f64,
    pub status: WeightStatus,
}

impl ParsedWeight {
    const ERROR: ParsedWeight = ParsedWeight {
        value: 0.0,
        status: WeightStatus::Error,
    };
}

/// Parse the longest numeric prefix of `s`, ignoring trailing text.
/// Returns `None` when no digits lead the string or the value is not finite.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let m = FLOAT_PREFIX.find(s)?;
    m.as_str()
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Free-form stability hint: any `u`, `m` or `instable` left after the number
/// marks the reading as moving. Coarse (a trailing `mg` trips it) but it is
/// what installed firmwares rely on; replace here when a stricter protocol lands.
pub fn hints_unstable(rest: &str) -> bool {
    rest.contains('u') || rest.contains('m') || rest.contains("instable")
}

/// Parse one raw scale response line.
pub fn parse_weight(text: &str) -> ParsedWeight {
    let normalized = text.trim().to_lowercase();

    if normalized == "error" || normalized.contains("err") || normalized == "disconnect" {
        return ParsedWeight::ERROR;
    }

    if let Some(caps) = STRICT.captures(&normalized) {
        let payload = caps[2].replace(',', ".");
        let Some(value) = parse_float_prefix(&payload) else {
            return ParsedWeight::ERROR;
        };
        let status = if &caps[1] == "s" {
            WeightStatus::Stable
        } else {
            WeightStatus::Unstable
        };
        return ParsedWeight { value, status };
    }

    let Some(caps) = LEADING_NUMBER.captures(&normalized) else {
        return ParsedWeight::ERROR;
    };
    let Some(value) = parse_float_prefix(&caps[1].replace(',', ".")) else {
        return ParsedWeight::ERROR;
    };
    let rest = caps
        .get(0)
        .map_or("", |m| &normalized[m.end()..]);
    let status = if hints_unstable(rest) {
        WeightStatus::Unstable
    } else {
        WeightStatus::Stable
    };
    ParsedWeight { value, status }
}
