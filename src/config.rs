//! Runtime configuration, built once at startup and passed down by reference.

use std::path::PathBuf;
use std::time::Duration;

use crate::git::IdentityFilter;

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DEADLINE_SECS: u64 = 600;
pub const DEFAULT_PORT: u16 = 8080;
pub const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub organizations: Vec<String>,
    pub identity: IdentityFilter,
    /// Repository names never dispatched, compared case-insensitively.
    pub blacklist: Vec<String>,
    pub cache_dir: PathBuf,
    pub interval: Duration,
    /// Ceiling for one whole collection cycle.
    pub deadline: Duration,
    pub token: Option<String>,
    pub api_url: String,
    /// CORS origins; empty allows any.
    pub origins: Vec<String>,
    pub port: u16,
}

impl Config {
    pub fn default_cache_dir() -> PathBuf {
        std::env::temp_dir().join(".contribstats").join("cache")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organizations: Vec::new(),
            identity: IdentityFilter::default(),
            blacklist: Vec::new(),
            cache_dir: Self::default_cache_dir(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            token: None,
            api_url: GITHUB_API.to_string(),
            origins: Vec::new(),
            port: DEFAULT_PORT,
        }
    }
}
