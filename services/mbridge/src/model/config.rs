//! Top-level channel configuration file

use figment::{
    providers::{Env, Format, Json, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::channel::ChannelConfig;
use super::duration::{deserialize_duration_spec, duration_or_default};
use crate::error::{BridgeError, Result};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Prefix for environment overrides of top-level scalars
pub const ENV_PREFIX: &str = "MBRIDGE_";

/// Bridge configuration: metric TTL, exporter switch and the channel tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_duration_spec")]
    pub ttl: Option<String>,
    #[serde(default)]
    pub export_prometheus: bool,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl Config {
    /// Load from a JSON or YAML file (chosen by extension)
    ///
    /// `MBRIDGE_TTL` and `MBRIDGE_EXPORT_PROMETHEUS` override the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(BridgeError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let figment = match extension.as_str() {
            "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
            "json" | "" => Figment::new().merge(Json::file(path)),
            other => {
                return Err(BridgeError::config(format!(
                    "Unsupported config file format: {}",
                    other
                )))
            },
        };

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).only(&["ttl", "export_prometheus"]))
            .extract()
            .map_err(|e| {
                BridgeError::config(format!(
                    "Failed to load configuration from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        debug!(
            "Loaded {} channel(s) from {}",
            config.channels.len(),
            path.display()
        );
        Ok(config)
    }

    /// How long a cached metric stays fresh
    pub fn ttl(&self) -> Duration {
        duration_or_default(self.ttl.as_deref(), DEFAULT_TTL)
    }
}
