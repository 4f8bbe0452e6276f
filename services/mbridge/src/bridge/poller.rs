//! Time-driven read command producer

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::command::Command;
use crate::model::ChannelCatalog;

/// Delay between two polling cycles
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Poller {
    catalog: Arc<ChannelCatalog>,
    tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    interval: Duration,
}

impl Poller {
    pub fn new(
        catalog: Arc<ChannelCatalog>,
        tx: mpsc::Sender<Command>,
        cancel: CancellationToken,
        interval: Duration,
    ) -> Self {
        Self {
            catalog,
            tx,
            cancel,
            interval,
        }
    }

    /// Poll until cancelled; dropping `self` closes the read stream
    pub async fn run(self) {
        info!("start poller");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {},
            }
            if !self.cycle().await {
                break;
            }
        }
        info!("shutdown poller");
    }

    /// One pass over every device; `false` once stopped
    async fn cycle(&self) -> bool {
        let register_pause = self.catalog.config.register_pause();
        let cycle_pause = self.catalog.config.cycle_pause();
        debug!(
            "polling channel {} ({} devices)",
            self.catalog.title(),
            self.catalog.devices.len()
        );

        for device in &self.catalog.devices {
            if self.cancel.is_cancelled() {
                debug!("polling disabled; exit");
                return false;
            }
            trace!("polling device {}:{}", self.catalog.title(), device.title);

            for register in &device.registers {
                if self.cancel.is_cancelled() {
                    return false;
                }
                if register.mode.is_readable() {
                    trace!("polling register {}", register.key);
                    let sent = tokio::select! {
                        () = self.cancel.cancelled() => return false,
                        sent = self.tx.send(Command::Read(Arc::clone(register))) => sent,
                    };
                    if sent.is_err() {
                        return false;
                    }
                }
                if !self.pause(register_pause).await {
                    return false;
                }
            }
            if !self.pause(cycle_pause).await {
                return false;
            }
        }
        true
    }

    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}
