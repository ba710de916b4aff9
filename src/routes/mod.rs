//! API route handlers over the collection service.
//!
//! - `stats`: last good contribution report (GET / and GET /api/v1/stats)
//! - `status`: scheduler health (GET /api/v1/status)
//! - `collect`: on-demand collection (POST /api/v1/collect)

pub mod collect;
pub mod stats;
pub mod status;

use axum::Router;

use crate::service::ServiceHandle;

pub fn create_router(handle: ServiceHandle) -> Router {
    Router::new()
        .merge(stats::routes(handle.clone()))
        .merge(status::routes(handle.clone()))
        .merge(collect::routes(handle))
}
