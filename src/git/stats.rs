use git2::{ErrorCode, Repository, Sort};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::git::diff::{GitCommit, lines_changed};
use crate::git::identity::IdentityFilter;
use crate::models::RepoResult;

/// Walk the history reachable from HEAD and total the tracked committers' work.
///
/// Commits are visited topologically, newest first by commit time, which is
/// stable for a given repository state. A commit whose diff cannot be sized
/// still counts as a commit but contributes no lines. A repository without
/// any commits yields zero counts.
pub fn repository_stats(
    repo: &Repository,
    name: &str,
    filter: &IdentityFilter,
    cancel: &CancellationToken,
) -> Result<RepoResult> {
    let mut result = RepoResult::empty(name);

    let mut revwalk = repo.revwalk().map_err(|e| AppError::unreadable(name, e))?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(|e| AppError::unreadable(name, e))?;

    // push_head reports an unborn HEAD as a generic reference error
    match repo.head() {
        Ok(_) => {}
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            tracing::debug!(repo = %name, "no commits yet");
            return Ok(result);
        }
        Err(e) => return Err(AppError::unreadable(name, e)),
    }
    revwalk
        .push_head()
        .map_err(|e| AppError::unreadable(name, e))?;

    for oid in revwalk {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let oid = oid.map_err(|e| AppError::unreadable(name, e))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| AppError::unreadable(name, e))?;

        let tracked = {
            let committer = commit.committer();
            filter.is_tracked(&String::from_utf8_lossy(committer.email_bytes()))
        };
        if !tracked {
            continue;
        }

        result.commits += 1;
        match lines_changed(&GitCommit::new(repo, commit)) {
            Ok(lines) => result.lines += lines,
            Err(e) => {
                tracing::error!(repo = %name, commit = %oid, "failed to get lines: {}", e);
            }
        }
    }

    tracing::debug!(
        repo = %name,
        commits = result.commits,
        lines = result.lines,
        "processed repository"
    );

    Ok(result)
}
