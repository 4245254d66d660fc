//! Route modules for Menu PDF Server

pub mod generate;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            generate::PAGE_COUNT_HEADER,
            generate::REQUEST_ID_HEADER,
        ])
        .max_age(Duration::from_secs(3600));

    let body_limit = state.config().server.max_body_bytes;

    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/health", health::router())
        .merge(generate::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
