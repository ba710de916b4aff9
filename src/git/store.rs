//! Local mirror of remote repositories.
//!
//! Every repository lives at `<cache dir>/<repository id>` as a bare clone.
//! The first `ensure_present` clones; later calls fetch branch heads straight
//! into `refs/heads/*` so HEAD follows the remote's default branch. Tasks for
//! different repositories touch disjoint paths and need no locking.

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

const BRANCH_REFSPEC: &str = "+refs/heads/*:refs/heads/*";

/// Where to find a repository and what to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    /// Stable identifier, also the relative path inside the store.
    pub id: String,
    /// Short name, checked against the blacklist.
    pub name: String,
    pub clone_url: String,
}

pub trait RepositoryStore: Send + Sync {
    /// Clone `repo` on first sight, fetch it afterwards.
    fn ensure_present(&self, repo: &RepositoryDescriptor, cancel: &CancellationToken) -> Result<()>;

    /// Open a previously ensured repository for reading.
    fn open(&self, id: &str) -> Result<Repository>;
}

pub struct GitStore {
    base: PathBuf,
    token: Option<String>,
}

impl GitStore {
    pub fn new(base: impl Into<PathBuf>, token: Option<String>) -> Self {
        Self {
            base: base.into(),
            token,
        }
    }

    fn repo_path(&self, id: &str) -> PathBuf {
        self.base.join(id)
    }

    fn fetch_options<'a>(&'a self, cancel: &'a CancellationToken) -> FetchOptions<'a> {
        let mut callbacks = RemoteCallbacks::new();
        // Returning false aborts the transfer.
        callbacks.transfer_progress(move |_| !cancel.is_cancelled());
        if let Some(token) = self.token.as_deref() {
            callbacks.credentials(move |_, _, _| Cred::userpass_plaintext("x-access-token", token));
        }

        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks);
        opts
    }

    fn clone_into(
        &self,
        repo: &RepositoryDescriptor,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::unavailable(&repo.id, e))?;
        }

        RepoBuilder::new()
            .bare(true)
            .fetch_options(self.fetch_options(cancel))
            .clone(&repo.clone_url, path)
            .map_err(|e| AppError::unavailable(&repo.id, e))?;

        tracing::debug!(repo = %repo.id, path = %path.display(), "cloned");
        Ok(())
    }

    fn fetch(&self, repo: &RepositoryDescriptor, path: &Path, cancel: &CancellationToken) -> Result<()> {
        let local = Repository::open_bare(path).map_err(|e| AppError::unavailable(&repo.id, e))?;
        let mut remote = local
            .find_remote("origin")
            .or_else(|_| local.remote_anonymous(&repo.clone_url))
            .map_err(|e| AppError::unavailable(&repo.id, e))?;

        remote
            .fetch(&[BRANCH_REFSPEC], Some(&mut self.fetch_options(cancel)), None)
            .map_err(|e| AppError::unavailable(&repo.id, e))?;

        tracing::debug!(repo = %repo.id, path = %path.display(), "fetched");
        Ok(())
    }
}

impl RepositoryStore for GitStore {
    fn ensure_present(
        &self,
        repo: &RepositoryDescriptor,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let path = self.repo_path(&repo.id);
        if path.exists() {
            self.fetch(repo, &path, cancel)
        } else {
            self.clone_into(repo, &path, cancel)
        }
    }

    fn open(&self, id: &str) -> Result<Repository> {
        Repository::open_bare(self.repo_path(id)).map_err(|e| AppError::unavailable(id, e))
    }
}
