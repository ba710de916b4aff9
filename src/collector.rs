//! Fan-out/fan-in aggregation across repositories.
//!
//! One task per repository (no concurrency cap) syncs it through the
//! [`RepositoryStore`] and then walks its history. The coordinator consumes
//! exactly one outcome per dispatched task, racing results and errors against
//! a single deadline for the whole cycle:
//! - a result is merged into the report,
//! - an error is logged and the repository is left out of the report,
//! - the deadline discards everything and fails the cycle.
//!
//! On timeout or cancellation the remaining tasks are told to stop through a
//! child [`CancellationToken`]; they notice between commits or transfer chunks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::git::stats::repository_stats;
use crate::git::{IdentityFilter, RepositoryDescriptor, RepositoryStore};
use crate::models::{CollectReport, RepoResult};

pub struct Collector {
    store: Arc<dyn RepositoryStore>,
    filter: Arc<IdentityFilter>,
    blacklist: Vec<String>,
    deadline: Duration,
}

impl Collector {
    pub fn new(config: &Config, store: Arc<dyn RepositoryStore>) -> Self {
        Self {
            store,
            filter: Arc::new(config.identity.clone()),
            blacklist: config.blacklist.iter().map(|b| b.to_lowercase()).collect(),
            deadline: config.deadline,
        }
    }

    fn is_blacklisted(&self, repo: &RepositoryDescriptor) -> bool {
        let name = repo.name.to_lowercase();
        let id = repo.id.to_lowercase();
        self.blacklist.iter().any(|b| *b == name || *b == id)
    }

    pub async fn collect(
        &self,
        repos: Vec<RepositoryDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<CollectReport> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RepoResult>();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<AppError>();
        let tasks = cancel.child_token();

        let mut dispatched = 0usize;
        for repo in repos {
            if self.is_blacklisted(&repo) {
                tracing::info!(repo = %repo.id, "skipping blacklisted repository");
                continue;
            }
            dispatched += 1;

            let store = Arc::clone(&self.store);
            let filter = Arc::clone(&self.filter);
            let token = tasks.clone();
            let done_tx = done_tx.clone();
            let err_tx = err_tx.clone();

            tokio::spawn(async move {
                let id = repo.id.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_repo(store.as_ref(), &repo, &filter, &token)
                })
                .await;

                // Send failures mean the coordinator already gave up.
                match outcome {
                    Ok(Ok(result)) => {
                        let _ = done_tx.send(result);
                    }
                    Ok(Err(e)) => {
                        let _ = err_tx.send(e);
                    }
                    Err(e) => {
                        let _ = err_tx.send(AppError::Internal(format!("{}: task failed: {}", id, e)));
                    }
                }
            });
        }
        drop(done_tx);
        drop(err_tx);

        tracing::info!(repos = dispatched, "dispatched repositories");

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        let mut report = CollectReport::default();
        for _ in 0..dispatched {
            tokio::select! {
                Some(result) = done_rx.recv() => {
                    tracing::debug!(repo = %result.repo, "done");
                    report.push(result);
                }
                Some(err) = err_rx.recv() => {
                    tracing::error!("{}", err);
                }
                _ = &mut deadline => {
                    tasks.cancel();
                    tracing::error!(deadline = ?self.deadline, "collection timed out");
                    return Err(AppError::CollectionTimeout(self.deadline));
                }
                _ = cancel.cancelled() => {
                    tasks.cancel();
                    return Err(AppError::Cancelled);
                }
            }
        }

        tracing::info!(
            projects = report.projects(),
            commits = report.commits(),
            lines = report.lines(),
            "finished collecting stats"
        );

        Ok(report)
    }
}

fn process_repo(
    store: &dyn RepositoryStore,
    repo: &RepositoryDescriptor,
    filter: &IdentityFilter,
    cancel: &CancellationToken,
) -> Result<RepoResult> {
    store.ensure_present(repo, cancel)?;
    let local = store.open(&repo.id)?;
    repository_stats(&local, &repo.id, filter, cancel)
}
