//! Bridge facade and the per-channel execution pipeline
//!
//! ```text
//!  Poller ──read(1)──┐
//!                    ├─► Demultiplexer ──merged(1)──► Executor ──► ModbusClient ──► bus
//!  Commander ─write(64)┘                                  │
//!                                                         └──► MetricCache ◄── Bridge::get/list
//! ```
//!
//! One pipeline per channel. Bus access is serialized by the single merged
//! stream; reads served over HTTP come from the cache only.

pub mod cache;
pub mod client;
pub mod command;
pub mod commander;
pub mod demux;
pub mod executor;
pub mod poller;
pub mod processor;

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use cache::MetricCache;
pub use client::{ModbusClient, Reading};
pub use command::Command;
pub use commander::Commander;
pub use processor::ChannelProcessor;

use crate::error::{BridgeError, Result};
use crate::model::{Catalog, Config, Metric, RegisterPoint, RegisterRef};
use crate::transport::{TokioModbusFactory, TransportFactory};
use poller::POLL_INTERVAL;

/// Owns one [`ChannelProcessor`] per configured channel
#[derive(Debug)]
pub struct Bridge {
    catalog: Arc<Catalog>,
    processors: BTreeMap<String, Arc<ChannelProcessor>>,
    export_prometheus: bool,
}

impl Bridge {
    /// Bridge over tokio-modbus transports
    pub fn new(config: &Config, catalog: Catalog) -> Self {
        Self::with_factory(config, catalog, Arc::new(TokioModbusFactory), POLL_INTERVAL)
    }

    /// Bridge with a custom transport factory and polling interval
    pub fn with_factory(
        config: &Config,
        catalog: Catalog,
        factory: Arc<dyn TransportFactory>,
        poll_interval: Duration,
    ) -> Self {
        let ttl = config.ttl();
        let processors = catalog
            .channels()
            .iter()
            .map(|channel| {
                let processor = ChannelProcessor::new(
                    Arc::clone(channel),
                    ttl,
                    Arc::clone(&factory),
                    poll_interval,
                );
                (channel.title().to_string(), Arc::new(processor))
            })
            .collect();

        Self {
            catalog: Arc::new(catalog),
            processors,
            export_prometheus: config.export_prometheus,
        }
    }

    /// Start every channel
    pub async fn start(&self) {
        info!("Starting {} channel(s)", self.processors.len());
        join_all(self.processors.values().map(|p| p.start())).await;
    }

    /// Stop every channel; returns once all pipelines are joined
    pub async fn stop(&self) {
        info!("Stopping {} channel(s)", self.processors.len());
        join_all(self.processors.values().map(|p| p.stop())).await;
    }

    /// Cached metric for a reference
    ///
    /// Malformed references and unknown channels are errors; an unknown
    /// device or register on a known channel simply has no data.
    pub fn get(&self, reference: &str) -> Result<Option<Metric>> {
        let r = RegisterRef::parse(reference)?;
        let processor = self.processor(&r.channel)?;
        Ok(processor.cache().get(&r.key()))
    }

    /// Enqueue a write; acknowledged on enqueue, not on bus completion
    pub fn set(&self, reference: &str, value: u16) -> Result<()> {
        let r = RegisterRef::parse(reference)?;
        self.processor(&r.channel)?.commander().write(&r, value)
    }

    /// Fresh metrics of all channels, ordered by key
    pub fn list(&self) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .processors
            .values()
            .flat_map(|p| p.cache().list())
            .collect();
        metrics.sort_by(|a, b| a.key.cmp(&b.key));
        metrics
    }

    /// Every configured register, ordered by key
    pub fn regs(&self) -> Vec<Arc<RegisterPoint>> {
        self.catalog.sorted_points()
    }

    pub fn flush(&self) {
        for processor in self.processors.values() {
            processor.cache().flush();
        }
        info!("Flushed metric caches");
    }

    pub fn is_running(&self) -> bool {
        self.processors.values().any(|p| p.is_running())
    }

    pub fn channel_count(&self) -> usize {
        self.processors.len()
    }

    /// Stored cache entries over all channels, expired ones included
    pub fn cached_count(&self) -> usize {
        self.processors.values().map(|p| p.cache().len()).sum()
    }

    pub fn export_prometheus(&self) -> bool {
        self.export_prometheus
    }

    pub fn processors(&self) -> impl Iterator<Item = &Arc<ChannelProcessor>> {
        self.processors.values()
    }

    fn processor(&self, channel: &str) -> Result<&Arc<ChannelProcessor>> {
        self.processors
            .get(channel)
            .ok_or_else(|| BridgeError::reference(format!("channel not found: '{}'", channel)))
    }
}
