//! Per-channel pipeline: poller, commander, demultiplexer, executor and cache

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument, Span};

use super::cache::MetricCache;
use super::client::ModbusClient;
use super::commander::Commander;
use super::demux::Demultiplexer;
use super::executor::Executor;
use super::poller::Poller;
use crate::model::ChannelCatalog;
use crate::transport::TransportFactory;

pub const READ_QUEUE_CAPACITY: usize = 1;
pub const MERGED_QUEUE_CAPACITY: usize = 1;
pub const WRITE_QUEUE_CAPACITY: usize = 64;

struct RunningTasks {
    cancel: CancellationToken,
    poller: JoinHandle<()>,
    executor: JoinHandle<ModbusClient>,
    demux: JoinHandle<()>,
}

struct ProcessorState {
    /// Parked here while stopped; owned by the executor task while running
    client: Option<ModbusClient>,
    running: Option<RunningTasks>,
}

pub struct ChannelProcessor {
    catalog: Arc<ChannelCatalog>,
    cache: Arc<MetricCache>,
    commander: Commander,
    factory: Arc<dyn TransportFactory>,
    poll_interval: Duration,
    span: Span,
    state: Mutex<ProcessorState>,
    is_running: AtomicBool,
}

impl std::fmt::Debug for ChannelProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProcessor")
            .field("channel", &self.catalog.title())
            .field("is_running", &self.is_running())
            .finish()
    }
}

impl ChannelProcessor {
    pub fn new(
        catalog: Arc<ChannelCatalog>,
        ttl: Duration,
        factory: Arc<dyn TransportFactory>,
        poll_interval: Duration,
    ) -> Self {
        let span = info_span!("processor", channel = %catalog.title().to_lowercase());
        let client = ModbusClient::new(Arc::clone(&catalog), factory.create(&catalog.config));
        Self {
            commander: Commander::new(Arc::clone(&catalog)),
            cache: Arc::new(MetricCache::new(ttl)),
            catalog,
            factory,
            poll_interval,
            span,
            state: Mutex::new(ProcessorState {
                client: Some(client),
                running: None,
            }),
            is_running: AtomicBool::new(false),
        }
    }

    pub fn title(&self) -> &str {
        self.catalog.title()
    }

    pub fn catalog(&self) -> &Arc<ChannelCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    pub fn commander(&self) -> &Commander {
        &self.commander
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Launch demultiplexer, executor and poller, in that order
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.running.is_some() {
            return;
        }
        info!(parent: &self.span, "start {} processor ({})", self.title(), self.catalog.config);

        let client = match state.client.take() {
            Some(client) => client,
            None => self.new_client(),
        };

        let (read_tx, read_rx) = mpsc::channel(READ_QUEUE_CAPACITY);
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (merged_tx, merged_rx) = mpsc::channel(MERGED_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();

        let demux = Demultiplexer::new(read_rx, write_rx, merged_tx, cancel.clone());
        let demux = tokio::spawn(demux.run().instrument(self.span.clone()));

        let executor = Executor::new(client, Arc::clone(&self.cache), merged_rx);
        let executor = tokio::spawn(executor.run().instrument(self.span.clone()));

        let poller = Poller::new(
            Arc::clone(&self.catalog),
            read_tx,
            cancel.clone(),
            self.poll_interval,
        );
        let poller = tokio::spawn(poller.run().instrument(self.span.clone()));

        self.commander.attach(write_tx);
        state.running = Some(RunningTasks {
            cancel,
            poller,
            executor,
            demux,
        });
        self.is_running.store(true, Ordering::Release);
    }

    /// Signal stop and join poller, executor and demultiplexer, in that order
    ///
    /// Writes still queued when stop is signalled are discarded.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(tasks) = state.running.take() else {
            return;
        };
        info!(parent: &self.span, "stop channel processor {}", self.title());

        self.commander.detach();
        self.is_running.store(false, Ordering::Release);
        tasks.cancel.cancel();

        if let Err(e) = tasks.poller.await {
            error!(parent: &self.span, "poller task failed: {}", e);
        }
        let client = match tasks.executor.await {
            Ok(client) => client,
            Err(e) => {
                error!(parent: &self.span, "executor task failed: {}", e);
                self.new_client()
            },
        };
        state.client = Some(client);
        if let Err(e) = tasks.demux.await {
            error!(parent: &self.span, "demultiplexer task failed: {}", e);
        }

        info!(parent: &self.span, "stopped {} processor", self.title());
    }

    fn new_client(&self) -> ModbusClient {
        ModbusClient::new(
            Arc::clone(&self.catalog),
            self.factory.create(&self.catalog.config),
        )
    }
}
