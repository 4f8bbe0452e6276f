//! Sole consumer of a channel's merged command stream

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use super::cache::MetricCache;
use super::client::ModbusClient;
use super::command::Command;
use crate::model::Metric;

pub struct Executor {
    client: ModbusClient,
    cache: Arc<MetricCache>,
    rx: mpsc::Receiver<Command>,
}

impl Executor {
    pub fn new(client: ModbusClient, cache: Arc<MetricCache>, rx: mpsc::Receiver<Command>) -> Self {
        Self { client, cache, rx }
    }

    /// Execute commands in delivery order until the merged stream closes
    ///
    /// Returns the client so the connection outlives the task.
    pub async fn run(mut self) -> ModbusClient {
        info!("start executor");
        while let Some(cmd) = self.rx.recv().await {
            self.handle(cmd).await;
        }
        info!("shutdown executor");
        self.client
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Read(point) => match self.client.read(&point).await {
                Ok(reading) => {
                    trace!("{} : {} : {}", reading.raw, reading.value, point.key);
                    self.cache
                        .set(Metric::new(&point, reading.raw, reading.value));
                },
                Err(e) => warn!("read error: {}", e),
            },
            Command::Write(point, value) => {
                if let Err(e) = self.client.write(&point, value).await {
                    warn!("write error: {}", e);
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::bridge::client::tests::{channel_catalog, FixedTransport};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn executor(payload: Vec<u8>) -> (mpsc::Sender<Command>, Arc<MetricCache>, Executor, FixedTransport) {
        let catalog = channel_catalog();
        let transport = FixedTransport {
            payload,
            ..Default::default()
        };
        let client = ModbusClient::new(catalog, Box::new(transport.clone()));
        let cache = Arc::new(MetricCache::new(Duration::from_secs(30)));
        let (tx, rx) = mpsc::channel(4);
        (tx, Arc::clone(&cache), Executor::new(client, cache, rx), transport)
    }

    #[tokio::test]
    async fn test_reads_land_in_cache() {
        let catalog = channel_catalog();
        let (tx, cache, executor, _) = executor(vec![0x01, 0x01]);
        let handle = tokio::spawn(executor.run());

        tx.send(Command::Read(catalog.find("meter", "voltage").unwrap()))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        let metric = cache.get("line1:meter:voltage").unwrap();
        assert_eq!(metric.raw, 257);
        assert_eq!(metric.value, 514.0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failures_are_logged_and_skipped() {
        let catalog = channel_catalog();
        let (tx, cache, executor, transport) = executor(vec![1, 2, 3]);
        let handle = tokio::spawn(executor.run());

        tx.send(Command::Read(catalog.find("meter", "voltage").unwrap()))
            .await
            .unwrap();
        tx.send(Command::Write(catalog.find("meter", "alarm").unwrap(), 1))
            .await
            .unwrap();
        tx.send(Command::Write(catalog.find("meter", "relay").unwrap(), 1))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(cache.is_empty());
        assert!(logs_contain("read error"));
        assert!(logs_contain("write error"));
        // The pipeline kept going after both failures
        assert_eq!(transport.writes.lock().len(), 1);
    }
}
