//! Repository discovery through the GitHub organization listing.
//!
//! GET {api}/orgs/{org}/repos?per_page=100&page=N, page by page until a short
//! page comes back. Any failed page fails the whole listing so a cycle never
//! runs against a partial repository set.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::config::Config;
use crate::error::Result;
use crate::git::RepositoryDescriptor;

const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub trait RepositorySource: Send + Sync {
    fn list(&self) -> BoxFuture<'_, Result<Vec<RepositoryDescriptor>>>;
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    full_name: String,
    clone_url: String,
}

impl From<GitHubRepo> for RepositoryDescriptor {
    fn from(repo: GitHubRepo) -> Self {
        RepositoryDescriptor {
            id: format!("github.com/{}", repo.full_name),
            name: repo.name,
            clone_url: repo.clone_url,
        }
    }
}

pub struct GitHubSource {
    client: reqwest::Client,
    api_url: String,
    organizations: Vec<String>,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("contribstats/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        if config.token.is_none() {
            tracing::warn!(
                "No token provided, private organization members and repositories will not be visible"
            );
        }

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            organizations: config.organizations.clone(),
            token: config.token.clone(),
        })
    }

    async fn list_organization(&self, org: &str) -> Result<Vec<RepositoryDescriptor>> {
        let url = format!("{}/orgs/{}/repos", self.api_url, org);
        let mut repos = Vec::new();

        for page in 1.. {
            let mut request = self
                .client
                .get(&url)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let batch: Vec<GitHubRepo> = request.send().await?.error_for_status()?.json().await?;
            let last = batch.len() < PER_PAGE;
            repos.extend(batch.into_iter().map(RepositoryDescriptor::from));
            if last {
                break;
            }
        }

        tracing::debug!(org, repos = repos.len(), "listed organization");
        Ok(repos)
    }
}

impl RepositorySource for GitHubSource {
    fn list(&self) -> BoxFuture<'_, Result<Vec<RepositoryDescriptor>>> {
        Box::pin(async move {
            let mut repos = Vec::new();
            for org in &self.organizations {
                repos.extend(self.list_organization(org).await?);
            }
            Ok(repos)
        })
    }
}
