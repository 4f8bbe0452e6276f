//! Register-type aware Modbus client
//!
//! Sits between the executor and the raw transport. Reads are decoded into a
//! `(raw, value)` pair; writes normalize coil values to the wire sentinel.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};
use crate::model::{ChannelCatalog, RegisterMode, RegisterPoint, RegisterRef, RegisterType};
use crate::transport::{ModbusTransport, COIL_ON};

/// Decoded register value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub raw: u32,
    pub value: f64,
}

pub struct ModbusClient {
    catalog: Arc<ChannelCatalog>,
    transport: Box<dyn ModbusTransport>,
}

impl std::fmt::Debug for ModbusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusClient")
            .field("channel", &self.catalog.title())
            .finish()
    }
}

impl ModbusClient {
    pub fn new(catalog: Arc<ChannelCatalog>, transport: Box<dyn ModbusTransport>) -> Self {
        Self { catalog, transport }
    }

    /// One bus transaction of `register.size` units, decoded and scaled
    pub async fn read(&mut self, register: &RegisterPoint) -> Result<Reading> {
        let (slave, addr, qty) = (register.slave_id, register.address, register.size);
        let payload = match register.kind {
            RegisterType::Coil => self.transport.read_coils(slave, addr, qty).await?,
            RegisterType::Discrete => self.transport.read_discrete_inputs(slave, addr, qty).await?,
            RegisterType::Input => self.transport.read_input_registers(slave, addr, qty).await?,
            RegisterType::Holding => {
                self.transport
                    .read_holding_registers(slave, addr, qty)
                    .await?
            },
        };
        trace!("{} payload: {:02x?}", register.key, payload);

        let raw = decode_raw(&payload)?;
        let value = register.factor * f64::from(raw);
        if !value.is_finite() {
            return Err(BridgeError::decode(format!(
                "{}: {} * {} is not a finite number",
                register.key, register.factor, raw
            )));
        }
        Ok(Reading { raw, value })
    }

    /// Resolve a reference within this channel and read it
    pub async fn read_ref(&mut self, reference: &str) -> Result<(Reading, String)> {
        let point = self.resolve(reference)?;
        let reading = self.read(&point).await?;
        Ok((reading, point.title.clone()))
    }

    /// One write transaction; any non-zero coil value becomes `0xFF00`
    pub async fn write(&mut self, register: &RegisterPoint, value: u16) -> Result<()> {
        let (slave, addr) = (register.slave_id, register.address);
        match register.kind {
            RegisterType::Coil => {
                let word = if value > 0 { COIL_ON } else { 0 };
                self.transport.write_single_coil(slave, addr, word).await?;
            },
            RegisterType::Holding => {
                self.transport
                    .write_single_register(slave, addr, value)
                    .await?;
            },
            other => {
                return Err(BridgeError::rejected(format!(
                    "{} registers cannot be written: '{}'",
                    other, register.key
                )))
            },
        }
        debug!("{} <- {}", register.key, value);
        Ok(())
    }

    /// Resolve a reference and write it unless the register is read-only
    pub async fn write_ref(&mut self, reference: &str, value: u16) -> Result<()> {
        let point = self.resolve(reference)?;
        if point.mode == RegisterMode::ReadOnly {
            return Err(BridgeError::rejected(format!(
                "trying to write to read only register '{}'",
                point.key
            )));
        }
        self.write(&point, value).await
    }

    fn resolve(&self, reference: &str) -> Result<Arc<RegisterPoint>> {
        let r = RegisterRef::parse(reference)?;
        if r.channel != self.catalog.title() {
            return Err(BridgeError::reference(format!(
                "'{}' does not belong to channel '{}'",
                reference,
                self.catalog.title()
            )));
        }
        self.catalog
            .find(&r.device, &r.register)
            .ok_or_else(|| BridgeError::reference(format!("register not found: '{}'", r)))
    }
}

/// Fold a bus payload into an unsigned integer
///
/// Four-byte payloads are combined as `(hi << 8) + lo`, not `(hi << 16) | lo`.
/// Devices relying on 32-bit values see overlapping words; kept as deployed.
pub fn decode_raw(payload: &[u8]) -> Result<u32> {
    match payload {
        [] => Err(BridgeError::decode("no value")),
        [b] => Ok(u32::from(*b)),
        [hi, lo] => Ok(u32::from(u16::from_be_bytes([*hi, *lo]))),
        [a, b, c, d] => {
            let hi = u32::from(u16::from_be_bytes([*a, *b]));
            let lo = u32::from(u16::from_be_bytes([*c, *d]));
            Ok((hi << 8) + lo)
        },
        other => Err(BridgeError::decode(format!(
            "too large data chunk received: {:02x?}",
            other
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
pub(crate) mod tests {
    use super::*;
    use crate::model::{Catalog, Config};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Transport answering every read with a fixed payload and logging writes
    #[derive(Clone, Default)]
    pub(crate) struct FixedTransport {
        pub payload: Vec<u8>,
        pub writes: Arc<Mutex<Vec<(&'static str, u8, u16, u16)>>>,
    }

    #[async_trait]
    impl ModbusTransport for FixedTransport {
        async fn read_coils(&mut self, _: u8, _: u16, _: u16) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
        async fn read_discrete_inputs(&mut self, _: u8, _: u16, _: u16) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
        async fn read_input_registers(&mut self, _: u8, _: u16, _: u16) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
        async fn read_holding_registers(&mut self, _: u8, _: u16, _: u16) -> Result<Vec<u8>> {
            Ok(self.payload.clone())
        }
        async fn write_single_coil(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
            self.writes.lock().push(("coil", slave, addr, word));
            Ok(())
        }
        async fn write_single_register(&mut self, slave: u8, addr: u16, word: u16) -> Result<()> {
            self.writes.lock().push(("holding", slave, addr, word));
            Ok(())
        }
    }

    pub(crate) fn channel_catalog() -> Arc<ChannelCatalog> {
        let config: Config = serde_json::from_value(serde_json::json!({
            "channels": [{
                "title": "line1", "mode": "tcp", "connection": "127.0.0.1:502",
                "devices": [{"title": "meter", "slave_id": 4, "registers": [
                    {"title": "voltage", "type": "input", "address": 0, "factor": 2.0},
                    {"title": "relay", "type": "coil", "address": 3},
                    {"title": "setpoint", "type": "holding", "address": 20},
                    {"title": "locked", "type": "holding", "address": 21, "mode": "ro"},
                    {"title": "alarm", "type": "discrete", "address": 5, "mode": "rw"}
                ]}]
            }]
        }))
        .unwrap();
        let catalog = Catalog::build(&config).unwrap();
        Arc::clone(&catalog.channels()[0])
    }

    fn client(payload: Vec<u8>) -> (ModbusClient, FixedTransport) {
        let transport = FixedTransport {
            payload,
            ..Default::default()
        };
        (
            ModbusClient::new(channel_catalog(), Box::new(transport.clone())),
            transport,
        )
    }

    #[test]
    fn test_decode_lengths() {
        assert!(decode_raw(&[]).is_err());
        assert_eq!(decode_raw(&[0x7f]).unwrap(), 0x7f);
        assert_eq!(decode_raw(&[0x01, 0x01]).unwrap(), 257);
        assert_eq!(decode_raw(&[0x00, 0x01, 0x00, 0x02]).unwrap(), (1 << 8) + 2);
        assert!(matches!(
            decode_raw(&[1, 2, 3]),
            Err(BridgeError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_read_applies_factor() {
        let (mut client, _) = client(vec![0x01, 0x01]);
        let (reading, title) = client.read_ref("line1:meter:voltage").await.unwrap();
        assert_eq!(reading, Reading { raw: 257, value: 514.0 });
        assert_eq!(title, "voltage");
    }

    #[tokio::test]
    async fn test_zero_factor_scales_to_zero() {
        let (mut client, _) = client(vec![0x01, 0x01]);
        let mut point = crate::model::catalog::tests::point("line1", "meter", "muted");
        point.factor = 0.0;
        let reading = client.read(&point).await.unwrap();
        assert_eq!(reading, Reading { raw: 257, value: 0.0 });
    }

    #[tokio::test]
    async fn test_coil_write_sentinel() {
        let (mut client, transport) = client(vec![]);
        client.write_ref("line1:meter:relay", 1).await.unwrap();
        client.write_ref("line1:meter:relay", 0).await.unwrap();
        client.write_ref("line1:meter:relay", 42).await.unwrap();
        let words: Vec<u16> = transport.writes.lock().iter().map(|w| w.3).collect();
        assert_eq!(words, vec![0xFF00, 0x0000, 0xFF00]);
    }

    #[tokio::test]
    async fn test_holding_write_passes_value() {
        let (mut client, transport) = client(vec![]);
        client.write_ref("line1:meter:setpoint", 1234).await.unwrap();
        assert_eq!(transport.writes.lock()[0], ("holding", 4, 20, 1234));
    }

    #[tokio::test]
    async fn test_read_only_write_never_reaches_bus() {
        let (mut client, transport) = client(vec![]);
        let err = client.write_ref("line1:meter:locked", 1).await.unwrap_err();
        assert!(matches!(err, BridgeError::WriteRejected(_)));
        assert!(transport.writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_writable_type_rejected() {
        let (mut client, transport) = client(vec![]);
        let err = client.write_ref("line1:meter:alarm", 1).await.unwrap_err();
        assert!(matches!(err, BridgeError::WriteRejected(_)));
        assert!(transport.writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let (mut client, _) = client(vec![0, 1]);
        assert!(matches!(
            client.read_ref("line1:meter:nope").await,
            Err(BridgeError::ReferenceResolution(_))
        ));
        assert!(client.write_ref("other:meter:relay", 1).await.is_err());
    }
}
