use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{BootstrapError, FetchError};
use crate::market_data::types::{SNAPSHOT_OK, SnapshotResponse};
use crate::metrics::prometheus;
use crate::state::market::MarketEntity;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// One-shot source of the bootstrap snapshot.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<SnapshotResponse, FetchError>;
}

/// GET against the REST tickers endpoint.
pub struct RestSnapshotFetcher {
    url: String,
    client: Client,
    timeout: Duration,
}

impl RestSnapshotFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl SnapshotFetcher for RestSnapshotFetcher {
    async fn fetch(&self) -> Result<SnapshotResponse, FetchError> {
        debug!(url = %self.url, "fetching ticker snapshot");

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: FETCH_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Bounded-retry bootstrap over a [`SnapshotFetcher`].
pub struct SnapshotLoader {
    fetcher: Box<dyn SnapshotFetcher>,
    settings: LoaderSettings,
}

impl SnapshotLoader {
    pub fn new(fetcher: Box<dyn SnapshotFetcher>, settings: LoaderSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Fetch the snapshot, retrying transient failures with a fixed spacing.
    ///
    /// Returned entities always have `is_favorite == false`.
    pub async fn load(&self) -> Result<Vec<MarketEntity>, BootstrapError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = self.attempt().await;
            prometheus::record_fetch_latency(started.elapsed().as_secs_f64() * 1_000.0);

            match result {
                Ok(entities) => {
                    prometheus::record_fetch_attempt("ok");
                    info!(attempt, pairs = entities.len(), "ticker snapshot loaded");
                    return Ok(entities);
                }
                Err(err) => {
                    prometheus::record_fetch_attempt("error");
                    warn!(attempt, max_attempts, error = %err, "ticker snapshot fetch failed");

                    if attempt >= max_attempts {
                        return Err(BootstrapError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                }
            }

            info!(delay = ?self.settings.retry_delay, "retrying ticker snapshot");
            tokio::time::sleep(self.settings.retry_delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self) -> Result<Vec<MarketEntity>, FetchError> {
        let timeout = self.settings.attempt_timeout;
        let response = tokio::time::timeout(timeout, self.fetcher.fetch())
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        if response.status_code != SNAPSHOT_OK {
            return Err(FetchError::Api {
                status_code: response.status_code,
                message: response.message,
            });
        }

        Ok(decode_records(response.data))
    }
}

/// Decode snapshot records one by one. A record that does not decode is
/// logged and dropped; the rest of the list survives.
fn decode_records(records: Vec<serde_json::Value>) -> Vec<MarketEntity> {
    let total = records.len();
    let entities: Vec<MarketEntity> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<MarketEntity>(record) {
            Ok(entity) => Some(entity.from_snapshot()),
            Err(err) => {
                warn!(index, error = %err, "dropping malformed snapshot record");
                None
            }
        })
        .collect();

    let dropped = total - entities.len();
    if dropped > 0 {
        prometheus::record_snapshot_records_dropped(dropped as u64);
    }
    entities
}
