//! Configuration tree, register catalogue and cached metrics

pub mod catalog;
pub mod channel;
pub mod config;
pub mod duration;
pub mod metric;
pub mod register;

pub use catalog::{Catalog, ChannelCatalog, DevicePoints, RegisterPoint};
pub use channel::{ChannelConfig, ChannelMode, DeviceConfig, SerialParity, SerialSettings};
pub use config::Config;
pub use duration::format_duration;
pub use metric::Metric;
pub use register::{RegisterConfig, RegisterMode, RegisterRef, RegisterType};
