pub mod availability;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod helpers;
mod routes;
pub mod scheduler;
pub mod settings;
pub mod tracker;

use axum::{Router, http::StatusCode, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::scheduler::PresenceView;

/// Status requests carry no body.
const REQUEST_BODY_LIMIT: usize = 1024;

pub struct AppState {
    pub presence: watch::Receiver<PresenceView>,
}

/// Create the status router over the view published by the poll loop
pub fn create_app(presence: watch::Receiver<PresenceView>, request_timeout: Duration) -> Router {
    let state = Arc::new(AppState { presence });

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/status", get(routes::status))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT))
        .with_state(state)
}
