//! Shutdown signal handling

use tracing::{info, warn};

/// Resolve once the process is asked to stop
///
/// Unix: SIGINT (Ctrl+C) or SIGTERM. Elsewhere: Ctrl+C only.
/// Returns the name of the signal that fired, for the shutdown log line.
///
/// ```ignore
/// let reason = common::shutdown::wait_for_shutdown().await;
/// bridge.stop().await;
/// ```
pub async fn wait_for_shutdown() -> &'static str {
    #[cfg(unix)]
    let reason = {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!("SIGTERM handler unavailable ({}), Ctrl+C only", e);
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => "SIGINT",
            _ = async {
                match term_signal {
                    Some(mut sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending::<()>().await,
                }
            } => "SIGTERM",
        }
    };

    #[cfg(not(unix))]
    let reason = {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler failed: {}", e);
        }
        "Ctrl+C"
    };

    info!("Received {}, shutting down", reason);
    reason
}
