//! HTTP surface of the bridge

pub mod handlers;
pub mod prometheus;
pub mod routes;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::bridge::Bridge;

pub use routes::create_routes;

/// State shared by all handlers
#[derive(Debug)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self {
            bridge,
            started_at: Utc::now(),
        }
    }
}
