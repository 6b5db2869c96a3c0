use anyhow::Context;

use crate::market_data::feed::FeedSettings;
use crate::market_data::snapshot::LoaderSettings;
use crate::state::market_cache::MergePolicy;

pub const DEFAULT_REST_URL: &str = "https://b.cexyes.com/api/spot/tickers";
pub const DEFAULT_WS_URL: &str = "wss://stream.cexyes.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub rest_url: String,
    pub ws_url: String,
    /// Prometheus exporter port; exporter disabled when unset.
    pub metrics_port: Option<u16>,
    pub merge_policy: MergePolicy,
    pub loader: LoaderSettings,
    pub feed: FeedSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let rest_url = std::env::var("TICKER_REST_URL").unwrap_or_else(|_| DEFAULT_REST_URL.to_string());
        let ws_url = std::env::var("TICKER_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());

        let metrics_port = match std::env::var("TICKER_METRICS_PORT") {
            Ok(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("invalid TICKER_METRICS_PORT: {raw}"))?,
            ),
            Err(_) => None,
        };

        let reject_stale = match std::env::var("TICKER_REJECT_STALE") {
            Ok(raw) => parse_flag(&raw).with_context(|| format!("invalid TICKER_REJECT_STALE: {raw}"))?,
            Err(_) => false,
        };

        Ok(Self {
            log_level,
            rest_url,
            ws_url,
            metrics_port,
            merge_policy: if reject_stale {
                MergePolicy::RejectStale
            } else {
                MergePolicy::LastWriterWins
            },
            loader: LoaderSettings::default(),
            feed: FeedSettings::default(),
        })
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}
