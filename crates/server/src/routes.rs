use std::time::Duration;

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::observability::{encode_metrics, track_requests};
use crate::openapi::ApiDoc;

pub mod auth;
pub mod categories;
pub mod clusters;
pub mod services;

use auth::{require_bearer_token_state, ServerState};

/// `?locale=` on reads; when present every record carries a resolved label.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocaleQuery {
    /// Language code such as `en` or `fr`.
    pub locale: Option<String>,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    encode_metrics()
}

/// Build the full application router: public reads, admin mutations and docs.
pub fn build_router(state: ServerState, cors: CorsLayer, request_timeout: Duration) -> Router {
    // Public routes (health, metrics, reads)
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/clusters", get(clusters::tree))
        .route("/clusters/:id", get(clusters::get))
        .route("/categories/:id", get(categories::get))
        .route("/services/:id", get(services::get));

    // Admin routes behind the bearer token
    let admin = Router::new()
        .route("/clusters", post(clusters::create))
        .route("/clusters/reorder", put(clusters::reorder))
        .route("/clusters/:id", put(clusters::replace).delete(clusters::delete))
        .route("/clusters/:id/categories/bulk", put(clusters::sync_categories))
        .route("/clusters/:id/categories/reorder", put(clusters::reorder_categories))
        .route("/categories", post(categories::create))
        .route("/categories/unassigned", get(categories::unassigned))
        .route("/categories/deleted", get(categories::deleted))
        .route("/categories/:id", put(categories::replace).delete(categories::soft_delete))
        .route("/categories/:id/restore", post(categories::restore))
        .route("/categories/:id/reassign", put(categories::reassign))
        .route("/categories/:id/services", post(categories::create_service))
        .route("/categories/:id/services/bulk", put(categories::sync_services))
        .route("/categories/:id/services/reorder", put(categories::reorder_services))
        .route("/services/:id", put(services::replace).delete(services::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token_state));

    public
        .merge(admin)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(track_requests))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request with method and path
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status and latency on the way out
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
