//! Channel and device configuration

use common::serde_helpers::deserialize_u8_flexible;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::duration::{deserialize_duration_spec, duration_or_default, format_duration};
use super::register::RegisterConfig;

pub const DEFAULT_CYCLE_PAUSE: Duration = Duration::from_millis(100);
pub const DEFAULT_REGISTER_PAUSE: Duration = Duration::from_millis(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Link layer of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelMode {
    /// Modbus RTU over a serial line
    Rtu,
    /// Modbus TCP
    Tcp,
    /// RTU frames encapsulated in a TCP stream
    Enc,
}

impl ChannelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rtu => "rtu",
            Self::Tcp => "tcp",
            Self::Enc => "enc",
        }
    }
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rtu" => Ok(Self::Rtu),
            "tcp" => Ok(Self::Tcp),
            "enc" => Ok(Self::Enc),
            other => Err(format!("{:?} is not a valid channel operation mode", other)),
        }
    }
}

impl TryFrom<String> for ChannelMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelMode> for String {
    fn from(value: ChannelMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    None,
    #[default]
    Even,
    Odd,
}

/// Serial line settings, only used by `rtu` channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: SerialParity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    19200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: SerialParity::default(),
            stop_bits: default_stop_bits(),
        }
    }
}

/// One physical Modbus link and the devices behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub title: String,
    pub mode: ChannelMode,
    /// `host:port` for tcp/enc, serial device path for rtu
    pub connection: String,
    #[serde(default, deserialize_with = "deserialize_duration_spec")]
    pub cycle_pause: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration_spec")]
    pub register_pause: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration_spec")]
    pub timeout: Option<String>,
    #[serde(flatten)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl ChannelConfig {
    /// Pause after each device's registers
    pub fn cycle_pause(&self) -> Duration {
        duration_or_default(self.cycle_pause.as_deref(), DEFAULT_CYCLE_PAUSE)
    }

    /// Pause after each register
    pub fn register_pause(&self) -> Duration {
        duration_or_default(self.register_pause.as_deref(), DEFAULT_REGISTER_PAUSE)
    }

    /// Upper bound for one bus transaction
    pub fn timeout(&self) -> Duration {
        duration_or_default(self.timeout.as_deref(), DEFAULT_TIMEOUT)
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode: {}, conn: {}, devices: {}, cpause: {}, rpause: {}",
            self.mode,
            self.connection,
            self.devices.len(),
            format_duration(self.cycle_pause()),
            format_duration(self.register_pause()),
        )
    }
}

/// One slave unit on a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub title: String,
    /// Defaults to the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "deserialize_u8_flexible")]
    pub slave_id: u8,
    #[serde(default)]
    pub registers: Vec<RegisterConfig>,
}

impl DeviceConfig {
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.title)
    }
}
