//! Shared Serde deserializers
//!
//! Custom deserializers for configuration files written by hand.
//! Numeric fields accept multiple input formats:
//! - Native number `123` → 123
//! - String number `"123"` → 123
//! - `""` (empty string) → default

use serde::{Deserialize, Deserializer};

// ============================================================================
// Default Value Functions (for serde #[serde(default = "...")] attributes)
// ============================================================================

/// Default value: true
pub fn bool_true() -> bool {
    true
}

/// Default value: false
pub fn bool_false() -> bool {
    false
}

/// Default scale factor: 1.0
pub fn scale_one() -> f64 {
    1.0
}

// ============================================================================
// Custom Deserializers
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInt {
    Int(u64),
    String(String),
}

fn deserialize_uint_flexible<'de, D>(deserializer: D, max: u64) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = match StringOrInt::deserialize(deserializer)? {
        StringOrInt::Int(i) => i,
        StringOrInt::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                0
            } else {
                t.parse::<u64>()
                    .map_err(|_| D::Error::custom(format!("invalid integer: {}", s)))?
            }
        },
    };

    if value > max {
        return Err(D::Error::custom(format!(
            "integer {} out of range (max {})",
            value, max
        )));
    }
    Ok(value)
}

/// Deserialize u8 from a number or a numeric string; empty string yields 0
pub fn deserialize_u8_flexible<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_uint_flexible(deserializer, u64::from(u8::MAX)).map(|v| v as u8)
}

/// Deserialize u16 from a number or a numeric string; empty string yields 0
pub fn deserialize_u16_flexible<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_uint_flexible(deserializer, u64::from(u16::MAX)).map(|v| v as u16)
}

/// Custom deserializer for f64 that treats empty strings as default value (0.0)
pub fn deserialize_f64_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        Float(f64),
        String(String),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::Float(f) => Ok(f),
        StringOrFloat::String(s) => {
            if s.trim().is_empty() {
                Ok(0.0)
            } else {
                s.trim().parse::<f64>().map_err(serde::de::Error::custom)
            }
        },
    }
}
