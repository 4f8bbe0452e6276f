//! Write command producer
//!
//! Turns HTTP write requests into [`Command::Write`]s on the channel's write
//! stream. Callers are acknowledged on enqueue, never on bus completion.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use super::command::Command;
use crate::error::{BridgeError, Result};
use crate::model::{ChannelCatalog, RegisterMode, RegisterPoint, RegisterRef};

#[derive(Debug)]
pub struct Commander {
    catalog: Arc<ChannelCatalog>,
    /// Present only while the channel is running
    sender: RwLock<Option<mpsc::Sender<Command>>>,
}

impl Commander {
    pub fn new(catalog: Arc<ChannelCatalog>) -> Self {
        Self {
            catalog,
            sender: RwLock::new(None),
        }
    }

    pub(crate) fn attach(&self, sender: mpsc::Sender<Command>) {
        *self.sender.write() = Some(sender);
    }

    pub(crate) fn detach(&self) {
        self.sender.write().take();
    }

    /// Resolve a reference string and enqueue a write
    pub fn write_str(&self, reference: &str, value: u16) -> Result<()> {
        self.write(&RegisterRef::parse(reference)?, value)
    }

    /// Enqueue a write for a parsed reference of this channel
    pub fn write(&self, reference: &RegisterRef, value: u16) -> Result<()> {
        let point = self.resolve(reference)?;
        if point.mode == RegisterMode::ReadOnly {
            return Err(BridgeError::rejected(format!(
                "trying to write to read only register '{}'",
                point.key
            )));
        }

        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(BridgeError::unavailable(format!(
                "channel '{}' is not running",
                self.catalog.title()
            )));
        };

        trace!("enqueue write {} = {}", point.key, value);
        sender
            .try_send(Command::Write(point, value))
            .map_err(|e| match e {
                TrySendError::Full(_) => BridgeError::unavailable(format!(
                    "write queue of channel '{}' is full",
                    self.catalog.title()
                )),
                TrySendError::Closed(_) => BridgeError::unavailable(format!(
                    "channel '{}' is shutting down",
                    self.catalog.title()
                )),
            })
    }

    fn resolve(&self, reference: &RegisterRef) -> Result<Arc<RegisterPoint>> {
        if reference.channel != self.catalog.title() {
            return Err(BridgeError::reference(format!(
                "channel not found: '{}'",
                reference.channel
            )));
        }
        self.catalog
            .find(&reference.device, &reference.register)
            .ok_or_else(|| BridgeError::reference(format!("register not found: '{}'", reference)))
    }
}
