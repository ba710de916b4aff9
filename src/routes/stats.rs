//! Contribution report endpoint.
//!
//! GET / and GET /api/v1/stats
//!
//! Serves the last successfully collected report as indented JSON; 503 until
//! the first cycle completes. A failed or still-running cycle never interrupts
//! serving.

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::error::{AppError, Result};
use crate::service::ServiceHandle;

pub fn routes(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/", get(get_stats))
        .route("/api/v1/stats", get(get_stats))
        .with_state(handle)
}

async fn get_stats(State(handle): State<ServiceHandle>) -> Result<Response> {
    let report = handle.report()?;
    let body = serde_json::to_string_pretty(&*report)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectReport, RepoResult, ServiceStatus};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn not_ready_before_first_report() {
        let result = get_stats(State(ServiceHandle::default())).await;
        assert!(matches!(result, Err(AppError::NotReady)));
    }

    #[tokio::test]
    async fn serves_indented_report() {
        let handle = ServiceHandle::default();
        let report: CollectReport = [RepoResult {
            repo: "org/one".into(),
            commits: 2,
            lines: 7,
        }]
        .into_iter()
        .collect();
        handle.publish(report, ServiceStatus::default());

        let response = get_stats(State(handle)).await.unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("{\n  \""));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["commits"], 2);
        assert_eq!(value["lines"], 7);
        assert_eq!(value["projects"], 1);
    }
}
