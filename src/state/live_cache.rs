use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::market_data::feed::{self, FeedSettings};
use crate::market_data::snapshot::{RestSnapshotFetcher, SnapshotLoader};
use crate::market_data::stream::{StreamConnector, WsConnector};
use crate::state::market::MarketEntity;
use crate::state::market_cache::{MarketCache, MergePolicy};
use crate::state::query::{SortField, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Bootstrapping,
    Ready,
    /// Snapshot loaded but listed no pairs; no stream is running.
    ReadyNoPairs,
    /// Bootstrap failed; serving an empty list with no stream.
    ReadyEmpty,
    ShutDown,
}

/// What `initialize` produced. Every caller observes the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Loaded { pairs: usize },
    /// The source answered successfully with zero pairs.
    NoPairs,
    /// Every snapshot attempt failed.
    Failed { reason: String },
}

type OutcomeRx = watch::Receiver<Option<BootstrapOutcome>>;

/// Market data cache with a bootstrap-then-stream lifecycle.
///
/// Construct once at the composition root and share behind an `Arc`.
pub struct LiveCache {
    core: Arc<Core>,
    bootstrap: Mutex<Option<OutcomeRx>>,
}

/// Everything the detached bootstrap task needs.
struct Core {
    cache: Arc<MarketCache>,
    loader: SnapshotLoader,
    connector: Arc<dyn StreamConnector>,
    feed_settings: FeedSettings,
    state: Mutex<LifecycleState>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveCache {
    pub fn new(
        loader: SnapshotLoader,
        connector: Arc<dyn StreamConnector>,
        feed_settings: FeedSettings,
        policy: MergePolicy,
    ) -> Self {
        Self {
            core: Arc::new(Core {
                cache: Arc::new(MarketCache::new(policy)),
                loader,
                connector,
                feed_settings,
                state: Mutex::new(LifecycleState::Uninitialized),
                connected: Arc::new(AtomicBool::new(false)),
                shutdown: CancellationToken::new(),
                feed_task: Mutex::new(None),
            }),
            bootstrap: Mutex::new(None),
        }
    }

    /// REST bootstrap and websocket stream from `config`.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = RestSnapshotFetcher::new(&config.rest_url, config.loader.attempt_timeout);
        Self::new(
            SnapshotLoader::new(Box::new(fetcher), config.loader.clone()),
            Arc::new(WsConnector::new(&config.ws_url)),
            config.feed.clone(),
            config.merge_policy,
        )
    }

    /// Bootstrap once, then start the feed.
    ///
    /// The first call spawns the bootstrap as its own task; that call and
    /// every later one wait on the same outcome. Dropping a waiting caller
    /// does not abort the bootstrap. A failed bootstrap leaves the cache
    /// empty with no stream; it is reported, never raised.
    pub async fn initialize(&self) -> BootstrapOutcome {
        let mut rx = self.outcome_rx();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| BootstrapOutcome::Failed {
            reason: "bootstrap task ended without an outcome".to_string(),
        })
    }

    fn outcome_rx(&self) -> OutcomeRx {
        let mut slot = self.bootstrap.lock();
        if let Some(rx) = slot.as_ref() {
            return rx.clone();
        }

        let (tx, rx) = watch::channel(None);
        let core = Arc::clone(&self.core);
        tokio::spawn(async move {
            let outcome = core.bootstrap_once().await;
            tx.send_replace(Some(outcome));
        });
        *slot = Some(rx.clone());
        rx
    }

    /// Stop the feed: cancel any pending reconnect, close the open
    /// connection, and wait for the task to exit. Idempotent.
    pub async fn shutdown(&self) {
        self.core.shutdown.cancel();
        let handle = self.core.feed_task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "ticker feed task panicked");
            }
        }
        self.core.set_state(LifecycleState::ShutDown);
        self.core.connected.store(false, Ordering::Release);
    }

    pub fn state(&self) -> LifecycleState {
        *self.core.state.lock()
    }

    /// Outcome of the bootstrap, if it has completed.
    pub fn bootstrap_outcome(&self) -> Option<BootstrapOutcome> {
        self.bootstrap
            .lock()
            .as_ref()
            .and_then(|rx| rx.borrow().clone())
    }

    pub fn is_stream_connected(&self) -> bool {
        self.core.connected.load(Ordering::Acquire)
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        self.core.cache.last_update()
    }

    pub fn get_market_data(
        &self,
        field: Option<SortField>,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Vec<MarketEntity> {
        self.core.cache.get_market_data(field, order, limit)
    }

    pub fn get_default_sorted_data(&self, limit: Option<usize>) -> Vec<MarketEntity> {
        self.core.cache.get_default_sorted_data(limit)
    }

    pub fn get_total_count(&self) -> usize {
        self.core.cache.get_total_count()
    }

    pub fn fuzzy_search(&self, query: &str, limit: Option<usize>) -> Vec<MarketEntity> {
        self.core.cache.fuzzy_search(query, limit)
    }

    pub fn toggle_favorite(&self, pair_name: &str) -> bool {
        self.core.cache.toggle_favorite(pair_name)
    }

    pub fn get_favorites(&self) -> Vec<MarketEntity> {
        self.core.cache.get_favorites()
    }

    pub fn is_favorite(&self, pair_name: &str) -> bool {
        self.core.cache.is_favorite(pair_name)
    }
}

impl Core {
    async fn bootstrap_once(&self) -> BootstrapOutcome {
        self.set_state(LifecycleState::Bootstrapping);

        let entities = match self.loader.load().await {
            Ok(entities) => entities,
            Err(err) => {
                warn!(error = %err, "bootstrap failed, serving empty cache");
                self.set_state(LifecycleState::ReadyEmpty);
                return BootstrapOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let pairs = self.cache.populate(entities);
        if pairs == 0 {
            info!("bootstrap returned no pairs, stream not opened");
            self.set_state(LifecycleState::ReadyNoPairs);
            return BootstrapOutcome::NoPairs;
        }

        // Hold the task slot while checking shutdown so a concurrent
        // `shutdown` either sees the handle or prevents the spawn.
        let mut slot = self.feed_task.lock();
        if self.shutdown.is_cancelled() {
            info!(pairs, "bootstrap finished after shutdown, stream not opened");
        } else {
            *slot = Some(tokio::spawn(feed::run_feed(
                Arc::clone(&self.cache),
                Arc::clone(&self.connector),
                self.feed_settings.clone(),
                Arc::clone(&self.connected),
                self.shutdown.clone(),
            )));
            self.set_state(LifecycleState::Ready);
        }
        drop(slot);

        info!(pairs, "market data cache ready");
        BootstrapOutcome::Loaded { pairs }
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.lock();
        // Shutdown is terminal.
        if *state != LifecycleState::ShutDown {
            *state = next;
        }
    }
}
