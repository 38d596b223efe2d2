//! Router assembly: HTTP endpoints, CORS, request body limits, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Lecture PDFs are larger than axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Question bank
        .route("/api/v1/subjects", get(http::http_list_subjects))
        .route("/api/v1/subjects/:subject/packages", get(http::http_list_packages))
        .route(
            "/api/v1/subjects/:subject/packages/:package_id",
            get(http::http_get_quiz).put(http::http_put_package),
        )
        .route("/api/v1/subjects/:subject/packages/:package_id/submit", post(http::http_post_submit))
        .route("/api/v1/subjects/:subject/merge", post(http::http_post_merge))
        .route("/api/v1/generate", post(http::http_post_generate))
        // Results
        .route("/api/v1/results/subjects", get(http::http_result_subjects))
        .route("/api/v1/results/subjects/:subject/packages", get(http::http_result_packages))
        .route(
            "/api/v1/results/subjects/:subject/packages/:package/submissions",
            get(http::http_result_submissions),
        )
        .route("/api/v1/results/submissions/:name", get(http::http_result_report))
        .route("/api/v1/results/submissions/:name/csv", get(http::http_result_csv))
        // Question builder
        .route("/api/v1/builder", post(http::http_builder_open))
        .route("/api/v1/builder/:id", get(http::http_builder_get).delete(http::http_builder_close))
        .route("/api/v1/builder/:id/parse", post(http::http_builder_parse))
        .route("/api/v1/builder/:id/questions", post(http::http_builder_add))
        .route("/api/v1/builder/:id/export", get(http::http_builder_export))
        // State + body limit + CORS + HTTP tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
