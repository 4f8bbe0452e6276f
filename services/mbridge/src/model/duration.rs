//! Duration strings such as `250ms`, `1m30s` or `2h 15m`
//!
//! Parsed with `humantime`. A bare `0` is zero. Configuration values that fail
//! to parse fall back to the field default.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string, `None` when malformed
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s == "0" {
        return Some(Duration::ZERO);
    }
    humantime::parse_duration(s).ok()
}

/// Resolve an optional duration string against a default
pub fn duration_or_default(input: Option<&str>, default: Duration) -> Duration {
    input.and_then(parse_duration).unwrap_or(default)
}

/// Render a duration the way it is written in configuration files
pub fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// Accept a duration spec as a string, or a bare number of seconds
///
/// Environment overrides arrive as numbers when the value has no unit.
pub fn deserialize_duration_spec<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        Int(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Spec>::deserialize(deserializer)? {
        None => None,
        Some(Spec::Int(secs)) => Some(format!("{}s", secs)),
        Some(Spec::Float(secs)) => Some(format!("{}ms", (secs * 1000.0).round() as u64)),
        Some(Spec::Text(text)) => Some(text),
    })
}
