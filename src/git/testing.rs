//! Throwaway repositories for tests.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
    clock: Cell<i64>,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self {
            dir,
            repo,
            clock: Cell::new(1_500_000_000),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `files`, delete `removed`, and commit on top of HEAD as `email`.
    pub fn commit(&self, email: &str, files: &[(&str, &[u8])], removed: &[&str]) -> Oid {
        self.commit_as(email, email, files, removed)
    }

    /// Like [`TestRepo::commit`], with separate author and committer emails.
    pub fn commit_as(
        &self,
        author: &str,
        committer: &str,
        files: &[(&str, &[u8])],
        removed: &[&str],
    ) -> Oid {
        let mut index = self.repo.index().unwrap();

        for (name, content) in files {
            let path = self.dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        for name in removed {
            fs::remove_file(self.dir.path().join(name)).unwrap();
            index.remove_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let when = self.clock.get();
        self.clock.set(when + 60);
        let time = Time::new(when, 0);
        let author = Signature::new("Test Author", author, &time).unwrap();
        let committer = Signature::new("Test Committer", committer, &time).unwrap();

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(
                Some("HEAD"),
                &author,
                &committer,
                "test commit",
                &tree,
                &parents,
            )
            .unwrap()
    }
}
