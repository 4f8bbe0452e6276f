//! Prometheus text exposition of cached metrics

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::model::Metric;

const LABELS: &[&str] = &["channel", "device", "alias", "register"];

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), LABELS)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Three gauge families: raw, value and capture time in unix seconds
///
/// Built on a fresh registry per call so registers that went stale since
/// the last scrape disappear from the output.
pub fn render(metrics: &[Metric]) -> prometheus::Result<String> {
    let registry = Registry::new();
    let raw = gauge(&registry, "modbus_metric_raw", "Undecoded register value")?;
    let value = gauge(&registry, "modbus_metric_value", "Register value scaled by its factor")?;
    let timestamp = gauge(&registry, "modbus_metric_timestamp", "Capture time in unix seconds")?;

    for m in metrics {
        let labels = [
            m.channel.as_str(),
            m.device.as_str(),
            m.alias.as_str(),
            m.register.as_str(),
        ];
        raw.with_label_values(&labels).set(f64::from(m.raw));
        value.with_label_values(&labels).set(m.value);
        timestamp
            .with_label_values(&labels)
            .set(m.timestamp.timestamp() as f64);
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
