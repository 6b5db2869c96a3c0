use serde::{Deserialize, Deserializer, Serialize};

/// Topic suffix for the per-pair ticker channel.
pub const TICKER_TOPIC_SUFFIX: &str = "@ticker";

/// Envelope kind carrying a data push.
pub const MESSAGE_KIND_UPDATE: &str = "message";

/// Status code the bootstrap endpoint reports on success.
pub const SNAPSHOT_OK: i64 = 200;

/// 24h rolling ticker for one pair.
///
/// Every numeric field is kept as the text the feed sent. Parsing happens at
/// the point of comparison so one malformed field cannot poison the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(rename = "e", default, deserialize_with = "text")]
    pub event_type: String,
    #[serde(rename = "E", default, deserialize_with = "text")]
    pub event_time: String,
    #[serde(rename = "s", deserialize_with = "text")]
    pub symbol: String,
    #[serde(rename = "p", default, deserialize_with = "text")]
    pub price_change: String,
    #[serde(rename = "P", default, deserialize_with = "text")]
    pub price_change_percent: String,
    #[serde(rename = "w", default, deserialize_with = "text")]
    pub weighted_avg_price: String,
    #[serde(rename = "x", default, deserialize_with = "text")]
    pub prev_close_price: String,
    #[serde(rename = "c", default, deserialize_with = "text")]
    pub last_price: String,
    #[serde(rename = "Q", default, deserialize_with = "text")]
    pub last_qty: String,
    #[serde(rename = "b", default, deserialize_with = "text")]
    pub best_bid: String,
    #[serde(rename = "B", default, deserialize_with = "text")]
    pub best_bid_qty: String,
    #[serde(rename = "a", default, deserialize_with = "text")]
    pub best_ask: String,
    #[serde(rename = "A", default, deserialize_with = "text")]
    pub best_ask_qty: String,
    #[serde(rename = "o", default, deserialize_with = "text")]
    pub open: String,
    #[serde(rename = "h", default, deserialize_with = "text")]
    pub high: String,
    #[serde(rename = "l", default, deserialize_with = "text")]
    pub low: String,
    #[serde(rename = "v", default, deserialize_with = "text")]
    pub volume: String,
    #[serde(rename = "q", default, deserialize_with = "text")]
    pub quote_volume: String,
    #[serde(rename = "O", default, deserialize_with = "text")]
    pub open_time: String,
    #[serde(rename = "C", default, deserialize_with = "text")]
    pub close_time: String,
    #[serde(rename = "F", default, deserialize_with = "text")]
    pub first_trade_id: String,
    #[serde(rename = "L", default, deserialize_with = "text")]
    pub last_trade_id: String,
    #[serde(rename = "n", default, deserialize_with = "text")]
    pub trade_count: String,
}

impl Ticker {
    pub fn event_time_ms(&self) -> Option<f64> {
        parse_number(&self.event_time)
    }
}

/// Parse a text-encoded number. Empty, malformed and non-finite values yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accept a JSON string, number, or null and keep it as text.
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

/// Bootstrap endpoint body: `{status_code, message, data}`.
///
/// Records stay untyped so the loader can drop a bad one without losing
/// the rest of the list.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub status_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// Outbound subscription request: `{"sub": ["BTCUSDT@ticker", ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub sub: Vec<String>,
}

impl SubscribeRequest {
    /// One batched request covering every pair.
    pub fn tickers<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            sub: pairs
                .into_iter()
                .map(|pair| format!("{pair}{TICKER_TOPIC_SUFFIX}"))
                .collect(),
        }
    }
}

/// Inbound stream envelope: `{type, topic, data}`.
///
/// `data` stays untyped until the envelope is known to be a ticker push.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl StreamEnvelope {
    pub fn is_ticker_push(&self) -> bool {
        self.kind == MESSAGE_KIND_UPDATE && self.topic.ends_with(TICKER_TOPIC_SUFFIX)
    }

    pub fn into_ticker(self) -> Result<Ticker, serde_json::Error> {
        serde_json::from_value(self.data)
    }
}
