//! Application error types and HTTP response mapping.
//!
//! `AppError` covers repository-, cycle- and service-level failures. `DiffError`
//! is scoped to a single commit; the stats engine logs it and moves on.
//!
//! Error mappings:
//! - `NotReady` → 503
//! - `CollectionTimeout` → 504
//! - everything else → 500

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure to size a single commit.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("tree unavailable: {0}")]
    TreeUnavailable(#[source] git2::Error),

    #[error("parent unavailable: {0}")]
    ParentUnavailable(#[source] git2::Error),

    #[error("diff computation failed: {0}")]
    DiffComputationFailed(#[source] git2::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Repository unavailable: {repo}: {reason}")]
    RepositoryUnavailable { repo: String, reason: String },

    #[error("History unreadable: {repo}: {reason}")]
    HistoryUnreadable { repo: String, reason: String },

    #[error("Collection timed out after {0:?}")]
    CollectionTimeout(Duration),

    #[error("Collection cancelled")]
    Cancelled,

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("No report collected yet")]
    NotReady,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unavailable(repo: &str, reason: impl ToString) -> Self {
        AppError::RepositoryUnavailable {
            repo: repo.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unreadable(repo: &str, reason: impl ToString) -> Self {
        AppError::HistoryUnreadable {
            repo: repo.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Discovery(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CollectionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
