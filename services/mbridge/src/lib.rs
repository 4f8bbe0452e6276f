//! Modbus to HTTP bridge
//!
//! Polls configured Modbus registers over serial or TCP links, caches the
//! decoded values with a TTL and accepts queued register writes, all behind
//! a small HTTP API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Config (JSON/  │───►│     Catalog     │───►│     Bridge      │
//! │  YAML, figment) │    │ (RegisterPoint) │    │ (1 pipeline per │
//! └─────────────────┘    └─────────────────┘    │    channel)     │
//!                                               └────────┬────────┘
//!                                                        │
//!          ┌─────────────────────────────────────────────┤
//!          ▼                                             ▼
//! ┌─────────────────┐                          ┌─────────────────┐
//! │   API server    │                          │  tokio-modbus   │
//! │  (axum, /docs)  │                          │  (rtu/tcp/enc)  │
//! └─────────────────┘                          └─────────────────┘
//! ```
//!
//! - **`model`**: configuration tree, register catalogue, metrics
//! - **`transport`**: link-layer adapter over tokio-modbus
//! - **`bridge`**: per-channel poller/commander/demultiplexer/executor pipeline
//! - **`api`**: HTTP routes and handlers

pub mod api;
pub mod bootstrap;
pub mod bridge;
pub mod error;
pub mod model;
pub mod transport;

pub use bridge::Bridge;
pub use error::{BridgeError, Result};
pub use model::{Catalog, Config, Metric, RegisterPoint};
