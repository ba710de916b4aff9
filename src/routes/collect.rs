use axum::{Router, extract::State, http::StatusCode, routing::post};

use crate::service::ServiceHandle;

pub fn routes(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/api/v1/collect", post(trigger_collect))
        .with_state(handle)
}

async fn trigger_collect(State(handle): State<ServiceHandle>) -> StatusCode {
    handle.trigger();
    StatusCode::ACCEPTED
}
