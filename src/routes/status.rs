//! Collection status endpoint.
//!
//! GET /api/v1/status
//!
//! Reports whether a cycle is running, how many cycles and failures have
//! happened, when the last report was published and the last error seen.

use axum::{Json, Router, extract::State, routing::get};

use crate::error::Result;
use crate::models::ServiceStatus;
use crate::service::ServiceHandle;

pub fn routes(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/api/v1/status", get(get_status))
        .with_state(handle)
}

async fn get_status(State(handle): State<ServiceHandle>) -> Result<Json<ServiceStatus>> {
    let status = handle.status()?;
    Ok(Json(status))
}
