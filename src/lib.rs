use crate::server::handlers::{
    handle_layer_error, index_handler, not_found_handler, ping_backend_handler, upload_handler,
};
use crate::server::types::AppState;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::{Router, routing::get, routing::post};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod booter;
pub mod config;
pub mod core;
pub mod server;
pub mod statics;
pub mod utils;

/// The complete request handler; serverless hosts mount this directly.
pub fn app(state: AppState) -> Router {
    let request_body_limit = RequestBodyLimitLayer::new(state.config.body_limit);
    // elapsed timeouts come back as errors and are rendered as the 408 error page
    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_layer_error))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    Router::new()
        .route("/", get(index_handler))
        .route("/ping-colab", get(ping_backend_handler))
        .route("/upload", post(upload_handler))
        .fallback(not_found_handler)
        // the body limit layer below is the only ceiling
        .layer(DefaultBodyLimit::disable())
        .layer(request_body_limit)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
