//! Shared helpers for integration tests

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mbridge::model::{Catalog, ChannelConfig, Config};
use mbridge::transport::{ModbusTransport, TransportFactory};
use mbridge::{Bridge, BridgeError, Result};

/// One recorded bus write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub channel: String,
    pub table: &'static str,
    pub slave: u8,
    pub addr: u16,
    pub word: u16,
}

/// Bus state shared by every mock transport of one test
#[derive(Default)]
pub struct MockBus {
    /// Payload per (channel, slave, addr); missing entries answer `[0, 0]`
    payloads: Mutex<HashMap<(String, u8, u16), Vec<u8>>>,
    /// Channels whose every transaction fails
    failing: Mutex<Vec<String>>,
    writes: Mutex<Vec<RecordedWrite>>,
    in_flight: Mutex<HashMap<String, Arc<AtomicBool>>>,
    overlaps: AtomicUsize,
    transactions: AtomicUsize,
    latency: Mutex<Duration>,
}

impl MockBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_payload(&self, channel: &str, slave: u8, addr: u16, payload: Vec<u8>) {
        self.payloads
            .lock()
            .insert((channel.to_string(), slave, addr), payload);
    }

    pub fn fail_channel(&self, channel: &str) {
        self.failing.lock().push(channel.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().clone()
    }

    /// Transactions that started while another one on the same channel was running
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    fn guard(&self, channel: &str) -> Arc<AtomicBool> {
        Arc::clone(
            self.in_flight
                .lock()
                .entry(channel.to_string())
                .or_default(),
        )
    }
}

/// Transport of one channel on the mock bus
pub struct MockTransport {
    channel: String,
    bus: Arc<MockBus>,
}

impl MockTransport {
    async fn transact<T>(&self, op: impl FnOnce(&MockBus) -> Result<T>) -> Result<T> {
        let guard = self.bus.guard(&self.channel);
        if guard.swap(true, Ordering::SeqCst) {
            self.bus.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.bus.transactions.fetch_add(1, Ordering::SeqCst);

        let latency = *self.bus.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        let result = if self.bus.failing.lock().contains(&self.channel) {
            Err(BridgeError::bus("connection refused"))
        } else {
            op(&self.bus)
        };
        guard.store(false, Ordering::SeqCst);
        result
    }

    async fn read(&self, slave: u8, addr: u16) -> Result<Vec<u8>> {
        let key = (self.channel.clone(), slave, addr);
        self.transact(|bus| Ok(bus.payloads.lock().get(&key).cloned().unwrap_or(vec![0, 0])))
            .await
    }

    async fn write(&self, table: &'static str, slave: u8, addr: u16, word: u16) -> Result<()> {
        let channel = self.channel.clone();
        self.transact(|bus| {
            bus.writes.lock().push(RecordedWrite {
                channel,
                table,
                slave,
                addr,
                word,
            });
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ModbusTransport for MockTransport {
    async fn read_coils(&mut self, slave: u8, addr: u16, _qty: u16) -> Result<Vec<u8>> {
        self.read(slave, addr).await
    }

    async fn read_discrete_inputs(&mut self, slave: u8, addr: u16, _qty: u16) -> Result<Vec<u8>> {
        self.read(slave, addr).await
    }

    async fn read_input_registers(&mut self, slave: u8, addr: u16, _qty: u16) -> Result<Vec<u8>> {
        self.read(slave, addr).await
    }

    async fn read_holding_registers(
        &mut self,
        slave: u8,
        addr: u16,
        _qty: u16,
    ) -> Result<Vec<u8>> {
        self.read(slave, addr).await
    }

    async fn write_single_coil(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
        self.write("coil", slave, addr, word).await
    }

    async fn write_single_register(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
        self.write("holding", slave, addr, word).await
    }
}

pub struct MockFactory(pub Arc<MockBus>);

impl TransportFactory for MockFactory {
    fn create(&self, channel: &ChannelConfig) -> Box<dyn ModbusTransport> {
        Box::new(MockTransport {
            channel: channel.title.clone(),
            bus: Arc::clone(&self.0),
        })
    }
}

/// Two channels: `line1` (meter + relay board) and `line2` (one pump)
pub fn sample_config() -> Config {
    serde_json::from_value(serde_json::json!({
        "ttl": "30s",
        "export_prometheus": true,
        "channels": [
            {
                "title": "line1", "mode": "tcp", "connection": "127.0.0.1:502",
                "cycle_pause": "1ms", "register_pause": "1ms",
                "devices": [
                    {"title": "meter", "alias": "Main meter", "slave_id": 1, "registers": [
                        {"title": "voltage", "type": "input", "address": 0, "factor": 2.0},
                        {"title": "current", "type": "input", "address": 1, "factor": 0.1}
                    ]},
                    {"title": "relays", "slave_id": 2, "registers": [
                        {"title": "k1", "type": "coil", "address": 0},
                        {"title": "limit", "type": "holding", "address": 10},
                        {"title": "serial", "type": "holding", "address": 11, "mode": "ro"}
                    ]}
                ]
            },
            {
                "title": "line2", "mode": "enc", "connection": "127.0.0.1:4001",
                "cycle_pause": "1ms", "register_pause": "1ms",
                "devices": [
                    {"title": "pump", "slave_id": 7, "registers": [
                        {"title": "speed", "type": "holding", "address": 100}
                    ]}
                ]
            }
        ]
    }))
    .unwrap()
}

pub fn mock_bridge(config: &Config, bus: &Arc<MockBus>) -> Bridge {
    let catalog = Catalog::build(config).unwrap();
    Bridge::with_factory(
        config,
        catalog,
        Arc::new(MockFactory(Arc::clone(bus))),
        Duration::from_millis(10),
    )
}

/// Poll `cond` until it holds or five seconds pass
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
