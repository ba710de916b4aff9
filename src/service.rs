//! Periodic collection and the last good report.
//!
//! One cycle runs at startup, then once per interval and whenever
//! [`ServiceHandle::trigger`] is called. Cycles run one after another inside a
//! single task, so a slow cycle makes later ticks get skipped instead of
//! overlapping. Only a successful cycle replaces the served report.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::collector::Collector;
use crate::discovery::RepositorySource;
use crate::error::{AppError, Result};
use crate::models::{CollectReport, ServiceStatus};

#[derive(Debug, Default)]
struct ServiceState {
    report: Option<Arc<CollectReport>>,
    status: ServiceStatus,
}

/// Cheap-to-clone view shared with the HTTP layer.
#[derive(Clone, Default)]
pub struct ServiceHandle {
    state: Arc<RwLock<ServiceState>>,
    trigger: Arc<Notify>,
}

impl ServiceHandle {
    pub fn report(&self) -> Result<Arc<CollectReport>> {
        let state = self
            .state
            .read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        state.report.clone().ok_or(AppError::NotReady)
    }

    pub fn status(&self) -> Result<ServiceStatus> {
        let state = self
            .state
            .read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(state.status.clone())
    }

    /// Ask for a cycle as soon as the current one (if any) is done.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn publish(&self, report: CollectReport, status: ServiceStatus) {
        let mut state = self.state.write().unwrap();
        state.report = Some(Arc::new(report));
        state.status = status;
    }

    #[cfg(test)]
    pub(crate) async fn triggered(&self) {
        self.trigger.notified().await;
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ServiceState),
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        f(&mut state);
        Ok(())
    }
}

pub struct StatsService {
    collector: Collector,
    source: Arc<dyn RepositorySource>,
    interval: Duration,
    handle: ServiceHandle,
}

impl StatsService {
    pub fn new(collector: Collector, source: Arc<dyn RepositorySource>, interval: Duration) -> Self {
        Self {
            collector,
            source,
            interval,
            handle: ServiceHandle::default(),
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Bootstrapping cache and stats");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.handle.trigger.notified() => {
                    tracing::info!("on-demand collection requested");
                    ticker.reset();
                }
            }

            if let Err(e) = self.run_cycle(&cancel).await {
                tracing::error!("collection cycle failed: {}", e);
            }
        }

        tracing::info!("collector stopped");
    }

    /// Discover, collect, and publish one report. On failure the previous
    /// report stays in place.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<()> {
        self.handle.update(|state| state.status.running = true)?;

        let outcome = async {
            let repos = tokio::select! {
                _ = cancel.cancelled() => Err(AppError::Cancelled),
                listing = self.source.list() => listing,
            }?;
            self.collector.collect(repos, cancel).await
        }
        .await;

        let message = outcome.as_ref().err().map(|e| e.to_string());
        self.handle.update(|state| {
            state.status.running = false;
            state.status.cycles += 1;
            match &outcome {
                Ok(report) => {
                    state.report = Some(Arc::new(report.clone()));
                    state.status.last_success = Some(chrono::Utc::now());
                    state.status.last_error = None;
                }
                Err(_) => {
                    state.status.failures += 1;
                    state.status.last_error = message;
                }
            }
        })?;

        if outcome.is_ok() {
            tracing::info!("Updated cache and stats");
        }
        outcome.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::testing::TestRepo;
    use crate::git::{GitStore, IdentityFilter, RepositoryDescriptor};
    use futures::future::BoxFuture;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Hands out a scripted sequence of listings.
    struct ScriptedSource {
        listings: Mutex<Vec<Result<Vec<RepositoryDescriptor>>>>,
    }

    impl ScriptedSource {
        fn new(listings: Vec<Result<Vec<RepositoryDescriptor>>>) -> Arc<Self> {
            Arc::new(Self {
                listings: Mutex::new(listings.into_iter().rev().collect()),
            })
        }
    }

    impl RepositorySource for ScriptedSource {
        fn list(&self) -> BoxFuture<'_, Result<Vec<RepositoryDescriptor>>> {
            let next = self
                .listings
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()));
            Box::pin(async move { next })
        }
    }

    /// A listing that never answers, like a stalled API call.
    struct StalledSource;

    impl RepositorySource for StalledSource {
        fn list(&self) -> BoxFuture<'_, Result<Vec<RepositoryDescriptor>>> {
            Box::pin(futures::future::pending())
        }
    }

    fn service(cache: &TempDir, source: Arc<dyn RepositorySource>) -> StatsService {
        let config = Config {
            identity: IdentityFilter::new(["a@x.com"], Vec::<String>::new()),
            cache_dir: cache.path().to_path_buf(),
            ..Config::default()
        };
        let store = Arc::new(GitStore::new(&config.cache_dir, None));
        StatsService::new(Collector::new(&config, store), source, config.interval)
    }

    fn local(upstream: &TestRepo) -> RepositoryDescriptor {
        RepositoryDescriptor {
            id: "local/upstream".to_string(),
            name: "upstream".to_string(),
            clone_url: upstream.path().to_string_lossy().to_string(),
        }
    }

    #[tokio::test]
    async fn no_report_before_first_cycle() {
        let cache = TempDir::new().unwrap();
        let service = service(&cache, ScriptedSource::new(vec![]));

        assert!(matches!(service.handle().report(), Err(AppError::NotReady)));
        assert_eq!(service.handle().status().unwrap(), ServiceStatus::default());
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_report() {
        let upstream = TestRepo::new();
        upstream.commit("a@x.com", &[("a.txt", b"1\n2\n")], &[]);
        let cache = TempDir::new().unwrap();
        let service = service(
            &cache,
            ScriptedSource::new(vec![
                Ok(vec![local(&upstream)]),
                Err(AppError::Discovery("rate limited".to_string())),
            ]),
        );
        let handle = service.handle();
        let cancel = CancellationToken::new();

        service.run_cycle(&cancel).await.unwrap();
        let first = handle.report().unwrap();
        assert_eq!((first.commits(), first.lines(), first.projects()), (1, 2, 1));

        assert!(service.run_cycle(&cancel).await.is_err());
        assert_eq!(handle.report().unwrap(), first);

        let status = handle.status().unwrap();
        assert_eq!(status.cycles, 2);
        assert_eq!(status.failures, 1);
        assert!(!status.running);
        assert!(status.last_success.is_some());
        assert_eq!(
            status.last_error.as_deref(),
            Some("Discovery failed: rate limited")
        );
    }

    #[tokio::test]
    async fn new_cycle_replaces_report() {
        let upstream = TestRepo::new();
        upstream.commit("a@x.com", &[("a.txt", b"1\n")], &[]);
        let cache = TempDir::new().unwrap();
        let service = service(
            &cache,
            ScriptedSource::new(vec![Ok(vec![local(&upstream)]), Ok(vec![local(&upstream)])]),
        );
        let handle = service.handle();
        let cancel = CancellationToken::new();

        service.run_cycle(&cancel).await.unwrap();
        upstream.commit("a@x.com", &[("a.txt", b"1\n2\n3\n")], &[]);
        service.run_cycle(&cancel).await.unwrap();

        let report = handle.report().unwrap();
        assert_eq!((report.commits(), report.lines(), report.projects()), (2, 3, 1));
    }

    #[tokio::test]
    async fn run_collects_at_startup_and_stops_on_cancel() {
        let cache = TempDir::new().unwrap();
        let service = service(&cache, ScriptedSource::new(vec![Ok(vec![])]));
        let handle = service.handle();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(service.run(cancel.clone()));
        let start = std::time::Instant::now();
        while handle.report().is_err() && start.elapsed() < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(handle.report().unwrap().projects(), 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_discovery() {
        let cache = TempDir::new().unwrap();
        let service = service(&cache, Arc::new(StalledSource));
        let handle = service.handle();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(service.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.status().unwrap().running);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(3), task)
            .await
            .expect("collector did not stop")
            .unwrap();

        let status = handle.status().unwrap();
        assert!(!status.running);
        assert_eq!(status.last_error.as_deref(), Some("Collection cancelled"));
    }
}
