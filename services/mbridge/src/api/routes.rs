//! API route configuration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

#[cfg(feature = "swagger-ui")]
use utoipa::OpenApi;
#[cfg(feature = "swagger-ui")]
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    flush, get_metric, health_check, metrics, prometheus_metrics, registers, start, stop,
    write_metric,
};
use super::AppState;

// OpenAPI documentation - only compiled when swagger-ui feature is enabled
#[cfg(feature = "swagger-ui")]
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::start,
        crate::api::handlers::stop,
        crate::api::handlers::flush,
        crate::api::handlers::registers,
        crate::api::handlers::metrics,
        crate::api::handlers::prometheus_metrics,
        crate::api::handlers::get_metric,
        crate::api::handlers::write_metric,
        crate::api::handlers::health_check
    ),
    components(
        schemas(
            crate::model::Metric,
            common::ErrorResponse,
            common::api_types::HealthStatus,
            common::api_types::ComponentHealth,
            common::ServiceStatus
        )
    ),
    tags(
        (name = "mbridge", description = "Modbus to HTTP bridge API")
    )
)]
pub struct MbridgeApiDoc;

/// Create all API routes of the bridge
pub fn create_routes(state: Arc<AppState>) -> Router {
    let export_prometheus = state.bridge.export_prometheus();

    let mut router = Router::new()
        .route("/health", get(health_check))
        // Lifecycle
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/flush", post(flush))
        // Catalogue and cache
        .route("/registers", get(registers))
        .route("/metrics", get(metrics))
        .route("/metric/{metric}", get(get_metric).post(write_metric));

    if export_prometheus {
        router = router.route("/metrics/prometheus", get(prometheus_metrics));
    }

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(SwaggerUi::new("/docs").url("/openapi.json", MbridgeApiDoc::openapi()));

    router
        // Apply HTTP request logging middleware
        .layer(axum::middleware::from_fn(common::logging::http_request_logger))
        .with_state(state)
}
