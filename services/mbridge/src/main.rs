//! mbridge service entry point

use std::net::SocketAddr;
use std::sync::Arc;

use axum::serve;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use common::service_bootstrap::get_service_port;
use common::shutdown::wait_for_shutdown;
use mbridge::api::{create_routes, AppState};
use mbridge::bootstrap::{self, Args};
use mbridge::{Bridge, BridgeError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let service_info = bootstrap::service_info();

    bootstrap::initialize_logging(&args, &service_info)?;
    common::service_bootstrap::print_startup_banner(&service_info);

    let (config, catalog) = bootstrap::load_configuration(&args)?;
    for line in bootstrap::configuration_summary(&config, &catalog) {
        info!("{}", line);
    }

    // Validation mode: validate and exit
    if args.service.validate {
        info!("Validation completed successfully");
        return Ok(());
    }

    let bridge = Arc::new(Bridge::new(&config, catalog));
    if args.no_autostart {
        info!("Autostart disabled; waiting for POST /start");
    } else {
        bridge.start().await;
    }

    let port = get_service_port(args.port, &service_info);
    let bind_address = format!("{}:{}", args.service.bind_host(), port);
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        BridgeError::config(format!("Invalid bind address '{}': {}", bind_address, e))
    })?;

    let app = create_routes(Arc::new(AppState::new(Arc::clone(&bridge))));

    let socket = tokio::net::TcpSocket::new_v4()
        .map_err(|e| BridgeError::Io(format!("Failed to create socket: {}", e)))?;
    socket
        .set_reuseaddr(true)
        .map_err(|e| BridgeError::Io(format!("Failed to set SO_REUSEADDR: {}", e)))?;
    socket
        .bind(addr)
        .map_err(|e| BridgeError::Io(format!("Failed to bind to {}: {}", addr, e)))?;
    let listener = socket
        .listen(1024)
        .map_err(|e| BridgeError::Io(format!("Failed to listen: {}", e)))?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    #[cfg(feature = "swagger-ui")]
    info!("API docs: http://{}/docs", addr);

    let shutdown_token = CancellationToken::new();
    let server_token = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move { server_token.cancelled().await };
        if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!("Server error: {}", e);
        }
    });

    let signal = wait_for_shutdown().await;
    info!("Shutting down on {}", signal);

    shutdown_token.cancel();
    bridge.stop().await;
    if let Err(e) = server_handle.await {
        error!("Server task failed: {}", e);
    }

    info!("mbridge stopped");
    Ok(())
}
