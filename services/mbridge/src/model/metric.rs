//! Cached register value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

use super::catalog::RegisterPoint;

/// Latest decoded value of one register and its capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Metric {
    /// `channel:device:register`
    pub key: String,
    pub channel: String,
    pub device: String,
    /// Device alias
    pub alias: String,
    pub register: String,
    /// Undecoded bus value
    pub raw: u32,
    /// `raw * factor`
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// Build a metric for `point` stamped with the current time
    pub fn new(point: &RegisterPoint, raw: u32, value: f64) -> Self {
        Self::at(point, raw, value, Utc::now())
    }

    pub fn at(point: &RegisterPoint, raw: u32, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: point.key.clone(),
            channel: point.channel.clone(),
            device: point.device.clone(),
            alias: point.alias.clone(),
            register: point.title.clone(),
            raw,
            value,
            timestamp,
        }
    }

    /// Fresh iff `now - timestamp <= ttl`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.timestamp + ttl < now,
            // TTL beyond chrono's range never expires
            Err(_) => false,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key: {:<30} raw: {:<10} val: {:<10.2} ts: {}",
            self.key,
            self.raw,
            self.value,
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::model::catalog::tests::point;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_boundary() {
        let p = point("line1", "meter", "voltage");
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let m = Metric::at(&p, 1, 1.0, t0);
        let ttl = Duration::from_secs(30);

        assert!(!m.is_expired(ttl, t0 + chrono::Duration::seconds(30)));
        assert!(m.is_expired(ttl, t0 + chrono::Duration::milliseconds(30_001)));
    }

    #[test]
    fn test_display_format() {
        let p = point("line1", "meter", "voltage");
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(42);
        let m = Metric::at(&p, 2301, 230.1, ts);
        assert_eq!(
            m.to_string(),
            format!(
                "key: {:<30} raw: {:<10} val: {:<10} ts: 2024-05-01 12:00:00.042",
                "line1:meter:voltage", 2301, "230.10"
            )
        );
    }

    #[test]
    fn test_json_shape() {
        let p = point("line1", "meter", "voltage");
        let json = serde_json::to_value(Metric::new(&p, 7, 0.7)).unwrap();
        for field in ["key", "channel", "device", "alias", "register", "raw", "value", "timestamp"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["register"], "voltage");
        assert_eq!(json["raw"], 7);
    }
}
