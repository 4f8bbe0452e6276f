//! Link-layer adapter over tokio-modbus
//!
//! The bridge never speaks the Modbus wire protocol itself. A channel's
//! executor talks to a [`ModbusTransport`], which hands back raw payload
//! bytes: packed bits (LSB first) for coil/discrete tables and big-endian
//! words for input/holding tables.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_modbus::client::{rtu, tcp, Context};
use tokio_modbus::prelude::{Reader, Slave, SlaveContext, Writer};
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::model::{ChannelConfig, ChannelMode, SerialParity, SerialSettings};

/// Coil "on" sentinel on the wire
pub const COIL_ON: u16 = 0xFF00;

/// One Modbus master connection, used by exactly one task at a time
#[async_trait]
pub trait ModbusTransport: Send {
    async fn read_coils(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>>;

    async fn read_discrete_inputs(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>>;

    async fn read_input_registers(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>>;

    async fn read_holding_registers(&mut self, slave: u8, addr: u16, qty: u16)
        -> Result<Vec<u8>>;

    /// `word` is the raw coil value; only [`COIL_ON`] switches the coil on
    async fn write_single_coil(&mut self, slave: u8, addr: u16, word: u16) -> Result<()>;

    async fn write_single_register(&mut self, slave: u8, addr: u16, word: u16) -> Result<()>;
}

/// Builds the transport of a channel
pub trait TransportFactory: Send + Sync {
    fn create(&self, channel: &ChannelConfig) -> Box<dyn ModbusTransport>;
}

/// Factory producing [`TokioModbusTransport`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioModbusFactory;

impl TransportFactory for TokioModbusFactory {
    fn create(&self, channel: &ChannelConfig) -> Box<dyn ModbusTransport> {
        Box::new(TokioModbusTransport::new(channel))
    }
}

/// Pack coil states into bytes, first coil in the least significant bit
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Serialize register words big-endian
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// tokio-modbus backed transport
///
/// Connects on first use. A transport error or timeout drops the connection
/// and the next transaction dials again; Modbus exception responses keep it.
pub struct TokioModbusTransport {
    mode: ChannelMode,
    connection: String,
    serial: SerialSettings,
    timeout: Duration,
    ctx: Option<Context>,
}

impl std::fmt::Debug for TokioModbusTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioModbusTransport")
            .field("mode", &self.mode)
            .field("connection", &self.connection)
            .field("timeout", &self.timeout)
            .field("connected", &self.ctx.is_some())
            .finish()
    }
}

impl TokioModbusTransport {
    pub fn new(channel: &ChannelConfig) -> Self {
        Self {
            mode: channel.mode,
            connection: channel.connection.clone(),
            serial: channel.serial.clone(),
            timeout: channel.timeout(),
            ctx: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn connect(&mut self) -> Result<Context> {
        let slave = Slave(0);
        let ctx = match self.mode {
            ChannelMode::Tcp => tcp::attach_slave(self.dial().await?, slave),
            ChannelMode::Enc => rtu::attach_slave(self.dial().await?, slave),
            ChannelMode::Rtu => {
                let builder = tokio_serial::new(&self.connection, self.serial.baud_rate)
                    .data_bits(data_bits(self.serial.data_bits)?)
                    .parity(parity(self.serial.parity))
                    .stop_bits(stop_bits(self.serial.stop_bits)?);
                let port = SerialStream::open(&builder).map_err(|e| {
                    BridgeError::bus(format!("failed to open {}: {}", self.connection, e))
                })?;
                rtu::attach_slave(port, slave)
            },
        };
        info!("Connected {} link {}", self.mode, self.connection);
        Ok(ctx)
    }

    async fn dial(&mut self) -> Result<TcpStream> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.connection)).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(stream)
            },
            Ok(Err(e)) => Err(BridgeError::bus(format!(
                "failed to connect {}: {}",
                self.connection, e
            ))),
            Err(_) => Err(BridgeError::bus(format!(
                "connect to {} timed out after {:?}",
                self.connection, self.timeout
            ))),
        }
    }

    /// Connected context addressed to `slave`
    async fn context(&mut self, slave: u8) -> Result<&mut Context> {
        if self.ctx.is_none() {
            let ctx = self.connect().await?;
            self.ctx = Some(ctx);
        }
        match self.ctx.as_mut() {
            Some(ctx) => {
                ctx.set_slave(Slave(slave));
                Ok(ctx)
            },
            None => Err(BridgeError::bus("not connected")),
        }
    }

    fn settle<T>(
        &mut self,
        outcome: std::result::Result<tokio_modbus::Result<T>, tokio::time::error::Elapsed>,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(exception))) => Err(exception.into()),
            Ok(Err(e)) => {
                warn!("Dropping {} link {}: {}", self.mode, self.connection, e);
                self.ctx = None;
                Err(e.into())
            },
            Err(_) => {
                debug!("Dropping {} link {} after timeout", self.mode, self.connection);
                self.ctx = None;
                Err(BridgeError::bus(format!(
                    "transaction timed out after {:?}",
                    self.timeout
                )))
            },
        }
    }
}

#[async_trait]
impl ModbusTransport for TokioModbusTransport {
    async fn read_coils(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome = tokio::time::timeout(timeout, ctx.read_coils(addr, qty)).await;
        let bits = self.settle(outcome)?;
        Ok(pack_bits(&bits))
    }

    async fn read_discrete_inputs(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome = tokio::time::timeout(timeout, ctx.read_discrete_inputs(addr, qty)).await;
        let bits = self.settle(outcome)?;
        Ok(pack_bits(&bits))
    }

    async fn read_input_registers(&mut self, slave: u8, addr: u16, qty: u16) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome = tokio::time::timeout(timeout, ctx.read_input_registers(addr, qty)).await;
        let words = self.settle(outcome)?;
        Ok(words_to_bytes(&words))
    }

    async fn read_holding_registers(
        &mut self,
        slave: u8,
        addr: u16,
        qty: u16,
    ) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome = tokio::time::timeout(timeout, ctx.read_holding_registers(addr, qty)).await;
        let words = self.settle(outcome)?;
        Ok(words_to_bytes(&words))
    }

    async fn write_single_coil(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome =
            tokio::time::timeout(timeout, ctx.write_single_coil(addr, word == COIL_ON)).await;
        self.settle(outcome)
    }

    async fn write_single_register(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
        let timeout = self.timeout;
        let ctx = self.context(slave).await?;
        let outcome = tokio::time::timeout(timeout, ctx.write_single_register(addr, word)).await;
        self.settle(outcome)
    }
}

fn data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(BridgeError::config(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(BridgeError::config(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(parity: SerialParity) -> Parity {
    match parity {
        SerialParity::None => Parity::None,
        SerialParity::Even => Parity::Even,
        SerialParity::Odd => Parity::Odd,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn tcp_channel(connection: &str, timeout: &str) -> ChannelConfig {
        serde_json::from_value(serde_json::json!({
            "title": "t",
            "mode": "tcp",
            "connection": connection,
            "timeout": timeout,
        }))
        .unwrap()
    }

    #[test]
    fn test_pack_bits_lsb_first() {
        assert_eq!(pack_bits(&[true]), vec![0x01]);
        assert_eq!(pack_bits(&[false, true, false, true]), vec![0x0A]);
        let mut nine = vec![false; 9];
        nine[8] = true;
        nine[0] = true;
        assert_eq!(pack_bits(&nine), vec![0x01, 0x01]);
        assert!(pack_bits(&[]).is_empty());
    }

    #[test]
    fn test_words_big_endian() {
        assert_eq!(words_to_bytes(&[0x0101]), vec![0x01, 0x01]);
        assert_eq!(words_to_bytes(&[0x1234, 0xABCD]), vec![0x12, 0x34, 0xAB, 0xCD]);
    }

    #[test]
    fn test_serial_parameters() {
        assert!(matches!(data_bits(8), Ok(DataBits::Eight)));
        assert!(data_bits(9).is_err());
        assert!(matches!(stop_bits(2), Ok(StopBits::Two)));
        assert!(stop_bits(3).is_err());
        assert_eq!(parity(SerialParity::Even), Parity::Even);
    }

    #[tokio::test]
    async fn test_connect_refused_is_bus_error() {
        // Grab a free port, then close it so the connect is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = TokioModbusTransport::new(&tcp_channel(&addr.to_string(), "200ms"));
        let err = transport.read_holding_registers(1, 0, 1).await.unwrap_err();
        assert!(matches!(err, BridgeError::BusTransaction(_)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_transport_runs_on_spawned_task() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport: Box<dyn ModbusTransport> =
            TokioModbusFactory.create(&tcp_channel(&addr.to_string(), "200ms"));
        let handle = tokio::spawn(async move {
            let read = transport.read_coils(1, 0, 8).await;
            let write = transport.write_single_register(1, 0, 7).await;
            (read, write)
        });
        let (read, write) = handle.await.unwrap();
        assert!(matches!(read, Err(BridgeError::BusTransaction(_))));
        assert!(matches!(write, Err(BridgeError::BusTransaction(_))));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_and_drops_link() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let mut transport = TokioModbusTransport::new(&tcp_channel(&addr.to_string(), "100ms"));
        let err = transport.read_input_registers(1, 0, 1).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(!transport.is_connected());
        server.abort();
    }
}
