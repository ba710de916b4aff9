use serde::{Deserialize, Serialize};

/// Matched activity in one repository for one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoResult {
    pub repo: String,
    pub commits: i64,
    pub lines: i64,
}

impl RepoResult {
    pub fn empty(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Default::default()
        }
    }
}

/// Whole-snapshot aggregate handed to the serving layer.
///
/// Totals are only ever updated through [`CollectReport::push`], so they always
/// equal the sums over `repos` and `projects` equals `repos.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectReport {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    repos: Vec<RepoResult>,
    commits: i64,
    lines: i64,
    projects: i64,
}

impl CollectReport {
    pub fn push(&mut self, result: RepoResult) {
        self.commits += result.commits;
        self.lines += result.lines;
        self.projects += 1;
        self.repos.push(result);
    }

    pub fn repos(&self) -> &[RepoResult] {
        &self.repos
    }

    pub fn commits(&self) -> i64 {
        self.commits
    }

    pub fn lines(&self) -> i64 {
        self.lines
    }

    pub fn projects(&self) -> i64 {
        self.projects
    }
}

impl FromIterator<RepoResult> for CollectReport {
    fn from_iter<I: IntoIterator<Item = RepoResult>>(iter: I) -> Self {
        let mut report = Self::default();
        for result in iter {
            report.push(result);
        }
        report
    }
}
