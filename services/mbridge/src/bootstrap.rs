//! Service bootstrap: command line, logging and configuration validation

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use common::bootstrap_args::ServiceArgs;
use common::service_bootstrap::ServiceInfo;

use crate::error::{BridgeError, Result};
use crate::model::{format_duration, Catalog, Config};

pub const SERVICE_NAME: &str = "mbridge";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mbridge/channels.json";

/// Command-line arguments for mbridge
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mbridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Modbus to HTTP bridge",
    long_about = None
)]
pub struct Args {
    /// Channel configuration file (JSON or YAML)
    #[arg(short = 'c', long, env = "CHANNELS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// HTTP listen port
    #[arg(short = 'p', long, env = "SERVICE_PORT")]
    pub port: Option<u16>,

    /// Do not start polling at boot; wait for POST /start
    #[arg(long)]
    pub no_autostart: bool,

    #[command(flatten)]
    pub service: ServiceArgs,
}

pub fn service_info() -> ServiceInfo {
    ServiceInfo::new(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        "Modbus to HTTP bridge - cyclic polling, cached metrics, queued writes",
        DEFAULT_PORT,
    )
}

/// Initialize logging from the command line
pub fn initialize_logging(args: &Args, service_info: &ServiceInfo) -> Result<()> {
    common::service_bootstrap::load_development_env();
    common::service_bootstrap::init_logging(
        service_info,
        &args.service.log_level,
        args.service.log_dir.as_deref(),
        !args.service.no_color,
        args.service.log_json,
    )
    .map_err(|e| BridgeError::config(format!("Failed to init logging: {}", e)))
}

/// Load the configuration file and build the register catalogue
pub fn load_configuration(args: &Args) -> Result<(Config, Catalog)> {
    info!("Loading channel configuration from {}", args.config.display());
    let config = Config::load(&args.config)?;
    let catalog = Catalog::build(&config)?;
    Ok((config, catalog))
}

/// Human-readable summary of a validated configuration
pub fn configuration_summary(config: &Config, catalog: &Catalog) -> Vec<String> {
    let mut lines = vec![format!(
        "{} channel(s), {} register(s), ttl {}, prometheus export {}",
        catalog.channels().len(),
        catalog.len(),
        format_duration(config.ttl()),
        if config.export_prometheus { "on" } else { "off" }
    )];
    for channel in catalog.channels() {
        lines.push(format!("  {}: {}", channel.title(), channel.config));
        for device in &channel.devices {
            lines.push(format!(
                "    {} (slave {}): {} register(s)",
                device.title,
                device.slave_id,
                device.registers.len()
            ));
        }
    }
    lines
}
