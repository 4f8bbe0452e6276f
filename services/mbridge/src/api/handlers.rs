//! HTTP handlers
//!
//! Control and listing endpoints answer in plain text; single-metric reads
//! and health answer in JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use common::api_types::{ComponentHealth, HealthStatus, ServiceStatus};
use common::{AppError, SuccessResponse};

use super::{prometheus, AppState};
use crate::model::Metric;

/// Start polling on every channel
///
/// @route POST /start
/// @output `ok\n`
#[utoipa::path(
    post,
    path = "/start",
    responses((status = 200, description = "All channels started", body = String)),
    tag = "mbridge"
)]
pub async fn start(State(state): State<Arc<AppState>>) -> &'static str {
    state.bridge.start().await;
    "ok\n"
}

/// Stop every channel and wait for the pipelines to drain
///
/// @route POST /stop
/// @output `ok\n`
#[utoipa::path(
    post,
    path = "/stop",
    responses((status = 200, description = "All channels stopped", body = String)),
    tag = "mbridge"
)]
pub async fn stop(State(state): State<Arc<AppState>>) -> &'static str {
    state.bridge.stop().await;
    "ok\n"
}

/// Drop every cached metric
///
/// @route POST /flush
#[utoipa::path(
    post,
    path = "/flush",
    responses((status = 200, description = "Caches cleared", body = String)),
    tag = "mbridge"
)]
pub async fn flush(State(state): State<Arc<AppState>>) -> &'static str {
    state.bridge.flush();
    "ok\n"
}

/// Configured registers as a text table
///
/// @route GET /registers
#[utoipa::path(
    get,
    path = "/registers",
    responses((status = 200, description = "Register table", body = String, content_type = "text/plain")),
    tag = "mbridge"
)]
pub async fn registers(State(state): State<Arc<AppState>>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<30} {:<8} {:<5} {:<5} {:<7} {:<7}",
        "reference", "type", "mode", "size", "addr", "factor"
    );
    for r in state.bridge.regs() {
        let _ = writeln!(
            out,
            "{:<30} {:<8} {:<5} {:<5} {:<7} {:<5.2}",
            r.key, r.kind, r.mode, r.size, r.address, r.factor
        );
    }
    out
}

/// Fresh metrics, one line each
///
/// @route GET /metrics
#[utoipa::path(
    get,
    path = "/metrics",
    responses((status = 200, description = "Cached metrics", body = String, content_type = "text/plain")),
    tag = "mbridge"
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    let mut out = String::new();
    for m in state.bridge.list() {
        let _ = writeln!(out, "{}", m);
    }
    out
}

/// Fresh metrics in Prometheus text format
///
/// Routed only when `export_prometheus` is enabled.
#[utoipa::path(
    get,
    path = "/metrics/prometheus",
    responses(
        (status = 200, description = "Prometheus exposition", body = String, content_type = "text/plain"),
        (status = 500, description = "Encoding failed", body = common::ErrorResponse)
    ),
    tag = "mbridge"
)]
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    prometheus::render(&state.bridge.list()).map_err(|e| AppError::internal_error(e.to_string()))
}

/// Cached value of one register
///
/// @route GET /metric/{metric}
/// @status 200 - Metric JSON
/// @status 204 - No fresh data
/// @status 404 - Reference cannot be resolved
#[utoipa::path(
    get,
    path = "/metric/{metric}",
    params(("metric" = String, Path, description = "Register reference channel:device:register")),
    responses(
        (status = 200, description = "Fresh metric", body = Metric),
        (status = 204, description = "No fresh data"),
        (status = 404, description = "Unknown reference", body = common::ErrorResponse)
    ),
    tag = "mbridge"
)]
pub async fn get_metric(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
) -> Result<Response, AppError> {
    match state.bridge.get(&metric)? {
        Some(m) => Ok(Json(m).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Queue a write of one 16-bit word
///
/// @route POST /metric/{metric}
/// @input body - decimal or `0x` hexadecimal word
/// @status 200 - Write enqueued
/// @status 400 - Unparsable value
/// @status 404 - Unknown reference
/// @status 409 - Register is not writable
/// @status 503 - Channel stopped or write queue full
#[utoipa::path(
    post,
    path = "/metric/{metric}",
    params(("metric" = String, Path, description = "Register reference channel:device:register")),
    request_body(content = String, description = "Decimal or 0x-prefixed hexadecimal u16", content_type = "text/plain"),
    responses(
        (status = 200, description = "Write enqueued", body = String),
        (status = 400, description = "Invalid value", body = common::ErrorResponse),
        (status = 404, description = "Unknown reference", body = common::ErrorResponse),
        (status = 409, description = "Register not writable", body = common::ErrorResponse),
        (status = 503, description = "Channel not accepting writes", body = common::ErrorResponse)
    ),
    tag = "mbridge"
)]
pub async fn write_metric(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    body: String,
) -> Result<&'static str, AppError> {
    let value = parse_word(&body).map_err(AppError::bad_request)?;
    state.bridge.set(&metric, value)?;
    Ok("ok")
}

/// Service health
///
/// @route GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthStatus)),
    tag = "mbridge"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Json<SuccessResponse<HealthStatus>> {
    let bridge = &state.bridge;
    let checks: HashMap<String, ComponentHealth> = bridge
        .processors()
        .map(|p| {
            let health = if p.is_running() {
                ComponentHealth::new(ServiceStatus::Healthy, None)
            } else {
                ComponentHealth::new(ServiceStatus::Degraded, Some("stopped".to_string()))
            };
            (p.title().to_string(), health)
        })
        .collect();

    let status = if checks.values().all(|c| c.status == ServiceStatus::Healthy) {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Degraded
    };

    let now = Utc::now();
    let health = HealthStatus {
        status,
        service: "mbridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (now - state.started_at).num_seconds().max(0) as u64,
        timestamp: now,
        checks,
    };

    Json(
        SuccessResponse::new(health)
            .with_metadata("running", bridge.is_running().into())
            .with_metadata("channels", bridge.channel_count().into())
            .with_metadata("cached_metrics", bridge.cached_count().into()),
    )
}

/// Parse a write value: decimal, or hexadecimal with a `0x`/`0X` prefix
pub fn parse_word(body: &str) -> Result<u16, String> {
    let text = body.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid value '{}': {}", text, e))
}
