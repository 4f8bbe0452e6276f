//! Flattened register catalogue
//!
//! The configuration tree carries no back-references. After loading, every
//! register is flattened together with its channel and device identity into
//! an immutable [`RegisterPoint`] shared by commands, the cache and the API.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::channel::ChannelConfig;
use super::config::Config;
use super::register::{metric_key, RegisterMode, RegisterRef, RegisterType};
use crate::error::{BridgeError, Result};

/// One register with the identity of its channel and device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterPoint {
    /// `channel:device:register`
    pub key: String,
    pub channel: String,
    pub device: String,
    pub alias: String,
    pub slave_id: u8,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RegisterType,
    pub mode: RegisterMode,
    pub address: u16,
    pub size: u16,
    pub factor: f64,
}

/// Registers of one device in declaration order
#[derive(Debug, Clone)]
pub struct DevicePoints {
    pub title: String,
    pub slave_id: u8,
    pub registers: Vec<Arc<RegisterPoint>>,
}

/// Everything one channel processor needs
#[derive(Debug, Clone)]
pub struct ChannelCatalog {
    pub config: ChannelConfig,
    pub devices: Vec<DevicePoints>,
    index: HashMap<String, Arc<RegisterPoint>>,
}

impl ChannelCatalog {
    pub fn title(&self) -> &str {
        &self.config.title
    }

    /// Find a register of this channel by device and register title
    pub fn find(&self, device: &str, register: &str) -> Option<Arc<RegisterPoint>> {
        self.index
            .get(&metric_key(&self.config.title, device, register))
            .cloned()
    }

    pub fn points(&self) -> impl Iterator<Item = &Arc<RegisterPoint>> {
        self.devices.iter().flat_map(|d| d.registers.iter())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Validated register catalogue of the whole configuration
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    channels: Vec<Arc<ChannelCatalog>>,
}

fn check_title(kind: &str, title: &str, context: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(BridgeError::config(format!(
            "{} without title in {}",
            kind, context
        )));
    }
    if title.contains(':') {
        return Err(BridgeError::config(format!(
            "{} title '{}' in {} must not contain ':'",
            kind, title, context
        )));
    }
    if title.trim() != title {
        return Err(BridgeError::config(format!(
            "{} title '{}' in {} has surrounding whitespace",
            kind, title, context
        )));
    }
    Ok(())
}

impl Catalog {
    /// Validate the configuration and flatten every register
    pub fn build(config: &Config) -> Result<Self> {
        let mut seen_channels = HashSet::new();
        let mut channels = Vec::with_capacity(config.channels.len());

        for channel in &config.channels {
            check_title("channel", &channel.title, "configuration")?;
            if !seen_channels.insert(channel.title.as_str()) {
                return Err(BridgeError::config(format!(
                    "duplicate channel title '{}'",
                    channel.title
                )));
            }
            if channel.connection.trim().is_empty() {
                return Err(BridgeError::config(format!(
                    "channel '{}' has no connection",
                    channel.title
                )));
            }

            let mut index = HashMap::new();
            let mut devices = Vec::with_capacity(channel.devices.len());

            for device in &channel.devices {
                let context = format!("channel '{}'", channel.title);
                check_title("device", &device.title, &context)?;

                let mut registers = Vec::with_capacity(device.registers.len());
                for register in &device.registers {
                    let context = format!("device '{}:{}'", channel.title, device.title);
                    check_title("register", &register.title, &context)?;

                    let key = metric_key(&channel.title, &device.title, &register.title);
                    if register.size == 0 {
                        return Err(BridgeError::config(format!(
                            "register '{}' has size 0",
                            key
                        )));
                    }
                    if !register.factor.is_finite() {
                        return Err(BridgeError::config(format!(
                            "register '{}' has a non-finite factor",
                            key
                        )));
                    }

                    let point = Arc::new(RegisterPoint {
                        key: key.clone(),
                        channel: channel.title.clone(),
                        device: device.title.clone(),
                        alias: device.alias().to_string(),
                        slave_id: device.slave_id,
                        title: register.title.clone(),
                        kind: register.kind,
                        mode: register.mode(),
                        address: register.address,
                        size: register.size,
                        factor: register.factor,
                    });
                    if index.insert(key.clone(), Arc::clone(&point)).is_some() {
                        return Err(BridgeError::config(format!(
                            "duplicate register reference '{}'",
                            key
                        )));
                    }
                    registers.push(point);
                }

                devices.push(DevicePoints {
                    title: device.title.clone(),
                    slave_id: device.slave_id,
                    registers,
                });
            }

            channels.push(Arc::new(ChannelCatalog {
                config: channel.clone(),
                devices,
                index,
            }));
        }

        Ok(Self { channels })
    }

    pub fn channels(&self) -> &[Arc<ChannelCatalog>] {
        &self.channels
    }

    pub fn channel(&self, title: &str) -> Option<&Arc<ChannelCatalog>> {
        self.channels.iter().find(|c| c.title() == title)
    }

    /// Look up a parsed reference
    pub fn resolve(&self, reference: &RegisterRef) -> Option<Arc<RegisterPoint>> {
        self.channel(&reference.channel)?
            .find(&reference.device, &reference.register)
    }

    /// All registers sorted by reference
    pub fn sorted_points(&self) -> Vec<Arc<RegisterPoint>> {
        let mut points: Vec<_> = self
            .channels
            .iter()
            .flat_map(|c| c.points().cloned())
            .collect();
        points.sort_by(|a, b| a.key.cmp(&b.key));
        points
    }

    /// Total number of registers
    pub fn len(&self) -> usize {
        self.channels.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
