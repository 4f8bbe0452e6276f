//! Shared service plumbing for the bridge services
//!
//! Provides the functions every service binary needs, including:
//! - logging initialization and the HTTP access-log middleware
//! - graceful shutdown signal handling
//! - startup banner, `.env` loading and port resolution
//! - the JSON response envelopes used by HTTP handlers

// Common modules
pub mod api_types;
pub mod logging;
pub mod serde_helpers;
pub mod service_bootstrap;
pub mod shutdown;

// Bootstrap modules
pub mod bootstrap_args;

// Re-export commonly used API types
pub use api_types::{ErrorInfo, ErrorResponse, ServiceStatus, SuccessResponse};

// Re-export AppError when axum feature is enabled
#[cfg(feature = "axum")]
pub use api_types::AppError;

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;

// Re-export CLI dependencies when cli feature is enabled
#[cfg(feature = "cli")]
pub use clap;
