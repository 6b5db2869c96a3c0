use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticker_cache::metrics::prometheus;
use ticker_cache::{BootstrapOutcome, Config, LiveCache, SortField, SortOrder};

/// How often the running cache logs a summary.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(30);
const SUMMARY_TOP_N: usize = 5;

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    if let Some(port) = config.metrics_port {
        prometheus::init_metrics_server(port)?;
        info!(port, "prometheus exporter listening");
    }

    info!(rest = %config.rest_url, ws = %config.ws_url, "ticker-cache starting");

    let cache = Arc::new(LiveCache::from_config(&config));

    match cache.initialize().await {
        BootstrapOutcome::Loaded { pairs } => info!(pairs, "bootstrap complete"),
        BootstrapOutcome::NoPairs => warn!("snapshot listed no pairs, running with an empty cache"),
        BootstrapOutcome::Failed { reason } => warn!(%reason, "bootstrap failed, running with an empty cache"),
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(SUMMARY_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => log_summary(&cache),
            _ = &mut ctrl_c => {
                info!("received Ctrl-C, shutting down");
                break;
            }
        }
    }

    cache.shutdown().await;
    Ok(())
}

fn log_summary(cache: &LiveCache) {
    let top = cache.get_market_data(Some(SortField::Volume24h), SortOrder::Desc, Some(SUMMARY_TOP_N));
    let leaders: Vec<String> = top
        .iter()
        .map(|e| format!("{}={}", e.pair_name, e.ticker.volume))
        .collect();

    info!(
        pairs = cache.get_total_count(),
        favorites = cache.get_favorites().len(),
        connected = cache.is_stream_connected(),
        state = ?cache.state(),
        last_update = ?cache.last_update(),
        top_volume = ?leaders,
        "cache summary"
    );
}
