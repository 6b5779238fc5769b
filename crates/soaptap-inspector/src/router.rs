//! Axum router wiring.
//!
//! `POST /:service` carries SOAP calls; `GET /metrics` renders interceptor
//! metrics in Prometheus text format.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/:service", post(transport::http::soap_call))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics().render()
}
