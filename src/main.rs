//! contribstats - contribution statistics for an organization's repositories
//!
//! # Usage
//! ```bash
//! contribstats -o my-org --domain my-org.com                # Collect every 60s, serve on :8080
//! contribstats -o my-org -m dev@example.com -i 300 -p 9000  # Custom interval and port
//! CONTRIBSTATS_TOKEN=... contribstats -o my-org --domain my-org.com
//! ```

mod collector;
mod config;
mod discovery;
mod error;
mod git;
mod models;
mod routes;
mod service;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collector::Collector;
use config::{Config, DEFAULT_DEADLINE_SECS, DEFAULT_INTERVAL_SECS, DEFAULT_PORT, GITHUB_API};
use discovery::GitHubSource;
use git::{GitStore, IdentityFilter};
use service::StatsService;

/// Collect contribution stats for an organization and serve them as JSON
#[derive(Parser)]
#[command(name = "contribstats")]
#[command(about = "Collect contribution stats for an organization", long_about = None)]
struct Cli {
    /// GitHub organizations whose repositories are collected
    #[arg(short = 'o', long = "organization", env = "CONTRIBSTATS_ORGANIZATIONS", value_delimiter = ',', required = true)]
    organizations: Vec<String>,

    /// Email addresses whose commits are counted
    #[arg(short = 'm', long = "member", env = "CONTRIBSTATS_MEMBERS", value_delimiter = ',')]
    members: Vec<String>,

    /// Email domains whose commits are counted
    #[arg(long = "domain", env = "CONTRIBSTATS_DOMAINS", value_delimiter = ',')]
    domains: Vec<String>,

    /// Repository names to skip (case-insensitive)
    #[arg(long = "blacklist", env = "CONTRIBSTATS_BLACKLIST", value_delimiter = ',')]
    blacklist: Vec<String>,

    /// Directory holding the local repository mirrors
    #[arg(long, env = "CONTRIBSTATS_CACHE", value_name = "DIR")]
    cache: Option<PathBuf>,

    /// Seconds between collection cycles
    #[arg(
        short, long,
        env = "CONTRIBSTATS_INTERVAL",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,

    /// Seconds a whole collection cycle may take before it is abandoned
    #[arg(
        long,
        env = "CONTRIBSTATS_DEADLINE",
        default_value_t = DEFAULT_DEADLINE_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    deadline: u64,

    /// GitHub token used for the API and for cloning
    #[arg(long, env = "CONTRIBSTATS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "CONTRIBSTATS_API_URL", default_value = GITHUB_API)]
    api_url: String,

    /// Allowed CORS origins (any when empty)
    #[arg(long = "origin", env = "CONTRIBSTATS_ORIGINS", value_delimiter = ',')]
    origins: Vec<String>,

    /// Port to run the server on
    #[arg(short, long, env = "CONTRIBSTATS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            organizations: self.organizations,
            identity: IdentityFilter::new(self.members, self.domains),
            blacklist: self.blacklist,
            cache_dir: self.cache.unwrap_or_else(Config::default_cache_dir),
            interval: Duration::from_secs(self.interval),
            deadline: Duration::from_secs(self.deadline),
            token: self.token.filter(|t| !t.is_empty()),
            api_url: self.api_url,
            origins: self.origins,
            port: self.port,
        }
    }
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid CORS origin")?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "contribstats=debug,tower_http=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    if config.identity.is_empty() {
        tracing::warn!("No members or domains configured, every repository will count zero");
    }

    std::fs::create_dir_all(&config.cache_dir)
        .with_context(|| format!("failed to create cache dir {}", config.cache_dir.display()))?;

    let store = Arc::new(GitStore::new(&config.cache_dir, config.token.clone()));
    let source = Arc::new(GitHubSource::new(&config)?);
    let service = StatsService::new(Collector::new(&config, store), source, config.interval);
    let handle = service.handle();

    let cancel = CancellationToken::new();
    let collector_task = tokio::spawn(service.run(cancel.clone()));

    let app = Router::new()
        .merge(routes::create_router(handle))
        .layer(cors_layer(&config.origins)?)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to port {}", config.port))?;

    println!();
    println!("  contribstats");
    println!();
    println!("  Organizations: {}", config.organizations.join(", "));
    println!("  Cache:         {}", config.cache_dir.display());
    println!("  Interval:      {:?}", config.interval);
    println!("  Server:        http://{}", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl+C: {}", e);
            }
            println!("\n  Shutting down...");
            cancel.cancel();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    cancel.cancel();
    collector_task.await?;

    Ok(())
}
