//! Register definitions and register references

use common::serde_helpers::{deserialize_f64_or_default, deserialize_u16_flexible, scale_one};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Modbus data table a register lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RegisterType {
    Coil,
    Discrete,
    Input,
    Holding,
}

impl RegisterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coil => "coil",
            Self::Discrete => "discrete",
            Self::Input => "input",
            Self::Holding => "holding",
        }
    }

    /// Only coils and holding registers accept writes on the bus
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Coil | Self::Holding)
    }

    /// Mode used when the configuration omits one
    pub fn default_mode(&self) -> RegisterMode {
        if self.is_writable() {
            RegisterMode::ReadWrite
        } else {
            RegisterMode::ReadOnly
        }
    }
}

impl FromStr for RegisterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coil" => Ok(Self::Coil),
            "discrete" => Ok(Self::Discrete),
            "input" => Ok(Self::Input),
            "holding" => Ok(Self::Holding),
            other => Err(format!("{:?} is not a valid register type", other)),
        }
    }
}

impl TryFrom<String> for RegisterType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegisterType> for String {
    fn from(value: RegisterType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Access mode of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RegisterMode {
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

impl RegisterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
            Self::WriteOnly => "wo",
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::WriteOnly)
    }
}

impl FromStr for RegisterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            "wo" => Ok(Self::WriteOnly),
            other => Err(format!("{:?} is not a valid register mode", other)),
        }
    }
}

impl TryFrom<String> for RegisterMode {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegisterMode> for String {
    fn from(value: RegisterMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RegisterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

fn default_size() -> u16 {
    1
}

/// One register as written in the channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RegisterType,
    /// Defaults to `rw` for coil/holding and `ro` for discrete/input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RegisterMode>,
    #[serde(default, deserialize_with = "deserialize_u16_flexible")]
    pub address: u16,
    #[serde(default = "default_size", deserialize_with = "deserialize_u16_flexible")]
    pub size: u16,
    /// Multiplier applied to the raw value; `0` is kept as written
    #[serde(default = "scale_one", deserialize_with = "deserialize_f64_or_default")]
    pub factor: f64,
}

impl RegisterConfig {
    /// Effective access mode
    pub fn mode(&self) -> RegisterMode {
        self.mode.unwrap_or_else(|| self.kind.default_mode())
    }
}

/// Parsed `channel:device:register` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisterRef {
    pub channel: String,
    pub device: String,
    pub register: String,
}

impl RegisterRef {
    /// Parse a reference: exactly three `:`-separated segments, each trimmed
    pub fn parse(reference: &str) -> Result<Self> {
        let parts: Vec<&str> = reference.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [channel, device, register] => Ok(Self {
                channel: (*channel).to_string(),
                device: (*device).to_string(),
                register: (*register).to_string(),
            }),
            _ => Err(BridgeError::reference(format!(
                "invalid reference passed: '{}'",
                reference
            ))),
        }
    }

    /// Cache key, identical to the metric key
    pub fn key(&self) -> String {
        metric_key(&self.channel, &self.device, &self.register)
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.channel, self.device, self.register)
    }
}

pub fn metric_key(channel: &str, device: &str, register: &str) -> String {
    format!("{}:{}:{}", channel, device, register)
}
