use git2::{Commit, DiffOptions, Patch, Repository, Tree};

use crate::error::DiffError;

/// Line counts for one contiguous changed region of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hunk {
    pub additions: i64,
    pub deletions: i64,
    pub context: i64,
}

/// Materialized patch for one changed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub path: Option<String>,
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

/// The slice of a commit the diff sizer needs.
///
/// Implemented by [`GitCommit`] for real repositories; tests supply their own
/// doubles so failure paths can be reached without corrupting an object store.
pub trait DiffCommit: Sized {
    type Tree;

    fn tree(&self) -> Result<Self::Tree, DiffError>;

    fn parent_count(&self) -> usize;

    fn parent(&self, index: usize) -> Result<Self, DiffError>;

    /// Per-file patches turning `old` (or the empty tree) into `new`.
    fn file_patches(
        &self,
        old: Option<&Self::Tree>,
        new: &Self::Tree,
    ) -> Result<Vec<FilePatch>, DiffError>;
}

/// Number of lines added by `commit` relative to its first parent.
///
/// Root commits are compared against the empty tree, so every line they
/// introduce counts. Binary files are skipped; context and deleted lines never
/// count.
pub fn lines_changed<C: DiffCommit>(commit: &C) -> Result<i64, DiffError> {
    let tree = commit.tree()?;

    let parent_tree = if commit.parent_count() != 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let patches = commit.file_patches(parent_tree.as_ref(), &tree)?;

    let mut lines = 0;
    for patch in &patches {
        if patch.is_binary {
            tracing::trace!(path = ?patch.path, "skipping binary file");
            continue;
        }
        for hunk in &patch.hunks {
            tracing::trace!(
                path = ?patch.path,
                additions = hunk.additions,
                deletions = hunk.deletions,
                context = hunk.context,
                "hunk"
            );
            lines += hunk.additions;
        }
    }

    Ok(lines)
}

/// A git2 commit paired with the repository it came from.
pub struct GitCommit<'r> {
    repo: &'r Repository,
    commit: Commit<'r>,
}

impl<'r> GitCommit<'r> {
    pub fn new(repo: &'r Repository, commit: Commit<'r>) -> Self {
        Self { repo, commit }
    }
}

impl<'r> DiffCommit for GitCommit<'r> {
    type Tree = Tree<'r>;

    fn tree(&self) -> Result<Tree<'r>, DiffError> {
        self.commit.tree().map_err(DiffError::TreeUnavailable)
    }

    fn parent_count(&self) -> usize {
        self.commit.parent_count()
    }

    fn parent(&self, index: usize) -> Result<Self, DiffError> {
        let parent = self
            .commit
            .parent(index)
            .map_err(DiffError::ParentUnavailable)?;
        Ok(Self::new(self.repo, parent))
    }

    fn file_patches(
        &self,
        old: Option<&Tree<'r>>,
        new: &Tree<'r>,
    ) -> Result<Vec<FilePatch>, DiffError> {
        let mut opts = DiffOptions::new();
        opts.context_lines(0);

        let diff = self
            .repo
            .diff_tree_to_tree(old, Some(new), Some(&mut opts))
            .map_err(DiffError::DiffComputationFailed)?;

        let mut files = Vec::with_capacity(diff.deltas().len());

        for delta_idx in 0..diff.deltas().len() {
            let Some(patch) =
                Patch::from_diff(&diff, delta_idx).map_err(DiffError::DiffComputationFailed)?
            else {
                continue;
            };

            let delta = patch.delta();
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string());
            let is_binary = delta.flags().is_binary();

            let mut hunks = Vec::with_capacity(patch.num_hunks());
            for hunk_idx in 0..patch.num_hunks() {
                let mut hunk = Hunk::default();
                let line_count = patch
                    .num_lines_in_hunk(hunk_idx)
                    .map_err(DiffError::DiffComputationFailed)?;

                for line_idx in 0..line_count {
                    let line = patch
                        .line_in_hunk(hunk_idx, line_idx)
                        .map_err(DiffError::DiffComputationFailed)?;
                    match line.origin() {
                        '+' => hunk.additions += 1,
                        '-' => hunk.deletions += 1,
                        ' ' => hunk.context += 1,
                        // EOF newline markers and headers
                        _ => {}
                    }
                }
                hunks.push(hunk);
            }

            files.push(FilePatch {
                path,
                is_binary,
                hunks,
            });
        }

        Ok(files)
    }
}
