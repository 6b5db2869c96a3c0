//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ticker_cache::error::{FetchError, StreamError};
use ticker_cache::market_data::feed::FeedSettings;
use ticker_cache::market_data::snapshot::{LoaderSettings, SnapshotFetcher, SnapshotLoader};
use ticker_cache::market_data::stream::{StreamConnection, StreamConnector};
use ticker_cache::market_data::types::SnapshotResponse;
use ticker_cache::{LiveCache, MarketEntity, MergePolicy, Ticker};

pub fn entity(pair: &str, sort_order: i64) -> MarketEntity {
    MarketEntity {
        id: sort_order,
        pair_name: pair.to_string(),
        image: format!("https://img.example/{}.png", pair.to_lowercase()),
        sort_order,
        ticker: Ticker {
            symbol: pair.to_string(),
            last_price: "1.0".into(),
            volume: "1.0".into(),
            ..Ticker::default()
        },
        is_favorite: false,
    }
}

pub fn ok_snapshot(pairs: &[&str]) -> SnapshotResponse {
    SnapshotResponse {
        status_code: 200,
        message: "success".into(),
        data: pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| serde_json::to_value(entity(pair, i as i64 + 1)).unwrap())
            .collect(),
    }
}

pub fn ticker_push(pair: &str, volume: &str) -> String {
    serde_json::json!({
        "type": "message",
        "topic": format!("{pair}@ticker"),
        "data": { "e": "24hrTicker", "E": "1700000000000", "s": pair, "c": "2.0", "v": volume }
    })
    .to_string()
}

/// Fetcher that answers every call the same way after an optional delay.
pub struct FakeFetcher {
    snapshot: Option<SnapshotResponse>,
    delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn ok(pairs: &[&str]) -> Self {
        Self {
            snapshot: Some(ok_snapshot(pairs)),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Never answers within the loader's attempt timeout.
    pub fn hanging() -> Self {
        Self {
            snapshot: None,
            delay: Duration::from_secs(60),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SnapshotFetcher for FakeFetcher {
    async fn fetch(&self) -> Result<SnapshotResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.snapshot
            .clone()
            .ok_or_else(|| FetchError::Decode("no snapshot scripted".into()))
    }
}

type Inbound = Result<String, StreamError>;

/// Test-side end of one fake connection.
pub struct Session {
    /// Frames or transport errors delivered to the cache.
    pub inbound: mpsc::UnboundedSender<Inbound>,
    /// Frames the cache sent.
    pub outbound: mpsc::UnboundedReceiver<String>,
    pub closed: Arc<AtomicBool>,
}

impl Session {
    pub fn push(&self, text: String) {
        self.inbound.send(Ok(text)).unwrap();
    }

    /// Deliver a transport error without closing the connection.
    pub fn fail(&self, reason: &str) {
        self.inbound
            .send(Err(StreamError::WebSocket(reason.to_string())))
            .unwrap();
    }
}

struct ChannelConnection {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl StreamConnection for ChannelConnection {
    async fn send(&mut self, text: String) -> Result<(), StreamError> {
        self.outbound.send(text).map_err(|_| StreamError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, StreamError>> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.close();
    }
}

/// Connector handing each new connection's test-side end to `sessions`.
pub struct ChannelConnector {
    pub attempts: Arc<AtomicUsize>,
    refuse: AtomicUsize,
    sessions: mpsc::UnboundedSender<Session>,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Session>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        let connector = Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse: AtomicUsize::new(0),
            sessions,
        };
        (connector, rx)
    }

    /// Fail the first `n` connects.
    pub fn refusing(self, n: usize) -> Self {
        self.refuse.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl StreamConnector for ChannelConnector {
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, StreamError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StreamError::Connect("connection refused".into()));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        self.sessions
            .send(Session {
                inbound: inbound_tx,
                outbound: outbound_rx,
                closed: Arc::clone(&closed),
            })
            .map_err(|_| StreamError::Connect("test dropped session receiver".into()))?;

        Ok(Box::new(ChannelConnection {
            inbound: inbound_rx,
            outbound: outbound_tx,
            closed,
        }))
    }
}

pub fn fast_loader(fetcher: FakeFetcher) -> SnapshotLoader {
    SnapshotLoader::new(
        Box::new(fetcher),
        LoaderSettings {
            attempt_timeout: Duration::from_millis(50),
            max_attempts: 3,
            retry_delay: Duration::from_millis(10),
        },
    )
}

pub fn live_cache(
    fetcher: FakeFetcher,
    connector: Arc<dyn StreamConnector>,
    reconnect_delay: Duration,
) -> LiveCache {
    LiveCache::new(
        fast_loader(fetcher),
        connector,
        FeedSettings { reconnect_delay },
        MergePolicy::LastWriterWins,
    )
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Await `fut` with a two second ceiling.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), fut)
        .await
        .expect("timed out waiting for test condition")
}
