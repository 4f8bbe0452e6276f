//! Command-line arguments shared by the bridge services
//!
//! Services embed [`ServiceArgs`] with `#[command(flatten)]` and add their own flags.

#[cfg(feature = "cli")]
use clap::Args;

/// Common service startup arguments
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Args))]
pub struct ServiceArgs {
    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter spec)
    #[cfg_attr(
        feature = "cli",
        arg(short = 'l', long, default_value = "info", env = "RUST_LOG")
    )]
    pub log_level: String,

    /// Directory for rolling log files; console only when unset
    #[cfg_attr(feature = "cli", arg(long, env = "MBRIDGE_LOG_DIR"))]
    pub log_dir: Option<String>,

    /// Optional bind address override (e.g., 127.0.0.1)
    #[cfg_attr(feature = "cli", arg(short = 'b', long, env = "BIND_ADDRESS"))]
    pub bind_address: Option<String>,

    /// Disable colored console output
    #[cfg_attr(feature = "cli", arg(long))]
    pub no_color: bool,

    /// Write JSON lines to the log files instead of bracketed text
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_json: bool,

    /// Only validate configuration without starting service
    #[cfg_attr(feature = "cli", arg(long))]
    pub validate: bool,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            bind_address: None,
            no_color: false,
            log_json: false,
            validate: false,
        }
    }
}

impl ServiceArgs {
    /// Parse the leading level of the directive into a `tracing::Level`
    ///
    /// `"warn,mbridge=debug"` yields `WARN`; anything unrecognized yields `INFO`.
    pub fn parse_log_level(&self) -> tracing::Level {
        let head = self.log_level.split(',').next().unwrap_or_default();
        match head.trim().to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Address to bind the HTTP server to, `0.0.0.0` by default
    pub fn bind_host(&self) -> &str {
        self.bind_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("0.0.0.0")
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = ServiceArgs::default();
        assert_eq!(args.log_level, "info");
        assert!(!args.no_color);
        assert!(!args.validate);
        assert_eq!(args.bind_host(), "0.0.0.0");
    }

    #[test]
    fn test_parse_log_level() {
        let args = ServiceArgs {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::DEBUG);

        let args = ServiceArgs {
            log_level: "WARN,mbridge=trace".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::WARN);

        let args = ServiceArgs {
            log_level: "mbridge=trace".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_bind_host_override() {
        let args = ServiceArgs {
            bind_address: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(args.bind_host(), "127.0.0.1");
    }
}
