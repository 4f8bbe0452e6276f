//! Service bootstrap helpers
//!
//! Startup banner, logging initialization and development environment setup.

use crate::logging::{self, LogConfig};
use std::path::PathBuf;
use tracing::info;

/// Service metadata for startup
pub struct ServiceInfo {
    /// Service name (e.g., "mbridge")
    pub name: String,
    /// Service version
    pub version: String,
    /// Service description
    pub description: String,
    /// Default port
    pub default_port: u16,
}

impl ServiceInfo {
    /// Create new service info
    ///
    /// Pass the caller's `env!("CARGO_PKG_VERSION")` so the banner reports the
    /// service version rather than this library's.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        default_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            default_port,
        }
    }
}

/// Print the startup banner
pub fn print_startup_banner(service: &ServiceInfo) {
    let banner = r#"
 ███╗   ███╗██████╗ ██████╗ ██╗██████╗  ██████╗ ███████╗
 ████╗ ████║██╔══██╗██╔══██╗██║██╔══██╗██╔════╝ ██╔════╝
 ██╔████╔██║██████╔╝██████╔╝██║██║  ██║██║  ███╗█████╗
 ██║╚██╔╝██║██╔══██╗██╔══██╗██║██║  ██║██║   ██║██╔══╝
 ██║ ╚═╝ ██║██████╔╝██║  ██║██║██████╔╝╚██████╔╝███████╗
 ╚═╝     ╚═╝╚═════╝ ╚═╝  ╚═╝╚═╝╚═════╝  ╚═════╝ ╚══════╝
    "#;

    info!("{}", banner);
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
    info!("");
}

/// Initialize logging for a service
///
/// * `level` - filter directive used when `RUST_LOG` is unset
/// * `log_dir` - directory for rolling files; console only when `None`
/// * `ansi` - colored console output
/// * `json` - JSON lines in the log files
pub fn init_logging(
    service: &ServiceInfo,
    level: &str,
    log_dir: Option<&str>,
    ansi: bool,
    json: bool,
) -> anyhow::Result<()> {
    let log_config = LogConfig {
        service_name: service.name.clone(),
        log_dir: log_dir.map(PathBuf::from),
        level: level.to_string(),
        ansi,
        enable_json: json,
        enable_api_log: true,
    };

    logging::init_with_config(log_config).map_err(|e| anyhow::anyhow!("{}", e))?;
    if log_dir.is_some() {
        logging::enable_sighup_log_reopen();
    }
    Ok(())
}

/// Load `.env` in debug builds; existing variables are never overridden.
///
/// Release builds expect the environment to be set externally.
pub fn load_development_env() {
    #[cfg(debug_assertions)]
    {
        if let Ok(content) = std::fs::read_to_string(".env") {
            for (key, value) in parse_env_lines(&content) {
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}

fn parse_env_lines(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.is_empty() {
            return None;
        }
        let (key, value) = trimmed.split_once('=')?;
        let value = value.trim().trim_matches('"');
        Some((key.trim(), value))
    })
}

/// Resolve the listen port: explicit value > `SERVICE_PORT` > `<NAME>_PORT` > default
pub fn get_service_port(explicit: Option<u16>, service: &ServiceInfo) -> u16 {
    if let Some(port) = explicit.filter(|p| *p > 0) {
        return port;
    }

    let service_var = format!("{}_PORT", service.name.to_uppercase());
    for var in ["SERVICE_PORT", service_var.as_str()] {
        if let Some(port) = std::env::var(var).ok().and_then(|p| p.parse::<u16>().ok()) {
            return port;
        }
    }

    service.default_port
}
