use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::market_data::stream::{StreamConnection, StreamConnector};
use crate::market_data::types::{StreamEnvelope, SubscribeRequest};
use crate::metrics::prometheus;
use crate::state::market_cache::{MarketCache, UpdateOutcome};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Fixed wait between a close and the next connect. No growth, no cap.
    pub reconnect_delay: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Keep the cache current until `shutdown` fires.
///
/// Each cycle connects, sends one batched subscription for every tracked
/// pair, and applies ticker pushes until the connection closes. Any close,
/// including a failed connect, schedules exactly one reconnect after
/// `reconnect_delay`.
pub async fn run_feed(
    cache: Arc<MarketCache>,
    connector: Arc<dyn StreamConnector>,
    settings: FeedSettings,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    let subscribe = SubscribeRequest::tickers(cache.pair_names().iter().map(String::as_str));
    info!(pairs = subscribe.sub.len(), "ticker feed started");

    loop {
        let connect = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = connector.connect() => result,
        };

        match connect {
            Ok(mut conn) => {
                prometheus::record_connect("ok");
                info!("ticker stream connected");
                connected.store(true, Ordering::Release);

                run_connection(conn.as_mut(), &cache, &subscribe, &shutdown).await;

                connected.store(false, Ordering::Release);
            }
            Err(err) => {
                prometheus::record_connect("error");
                warn!(error = %err, "ticker stream connect failed");
            }
        }

        if shutdown.is_cancelled() {
            break;
        }

        info!(delay = ?settings.reconnect_delay, "ticker stream closed, reconnecting");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
        }
    }

    info!("ticker feed stopped");
}

async fn run_connection(
    conn: &mut dyn StreamConnection,
    cache: &MarketCache,
    subscribe: &SubscribeRequest,
    shutdown: &CancellationToken,
) {
    let payload = match serde_json::to_string(subscribe) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to encode subscription");
            conn.close().await;
            return;
        }
    };

    if let Err(err) = conn.send(payload).await {
        warn!(error = %err, "failed to send subscription");
        conn.close().await;
        return;
    }
    debug!(topics = subscribe.sub.len(), "subscription sent");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                conn.close().await;
                return;
            }
            next = conn.recv() => next,
        };

        match next {
            Some(Ok(text)) => handle_message(cache, &text),
            // Transport errors are logged; a dead connection ends with `None`.
            Some(Err(err)) => warn!(error = %err, "ticker stream error"),
            None => return,
        }
    }
}

/// Decode one inbound frame and merge it if it is a ticker push.
pub fn handle_message(cache: &MarketCache, text: &str) {
    let envelope: StreamEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            prometheus::record_stream_message("malformed");
            warn!(error = %err, "discarding malformed stream message");
            return;
        }
    };

    if !envelope.is_ticker_push() {
        prometheus::record_stream_message("ignored");
        trace!(kind = %envelope.kind, topic = %envelope.topic, "non-ticker stream message ignored");
        return;
    }

    let ticker = match envelope.into_ticker() {
        Ok(ticker) => ticker,
        Err(err) => {
            prometheus::record_stream_message("malformed");
            warn!(error = %err, "discarding ticker push with malformed payload");
            return;
        }
    };
    prometheus::record_stream_message("ticker");

    let symbol = ticker.symbol.clone();
    let outcome = cache.apply_ticker(ticker);
    prometheus::record_ticker_update(outcome.as_str());
    if outcome == UpdateOutcome::Applied {
        trace!(%symbol, "ticker applied");
    }
}
