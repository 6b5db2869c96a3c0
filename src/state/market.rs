use serde::{Deserialize, Serialize};

use crate::market_data::types::Ticker;

/// One tracked trading pair with its latest ticker.
///
/// `pair_name` is the unique key. `sort_order` comes from the bootstrap
/// source and is never recomputed here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEntity {
    pub id: i64,
    pub pair_name: String,
    #[serde(default)]
    pub image: String,
    pub sort_order: i64,
    pub ticker: Ticker,
    /// User-local flag; wire name kept for the bootstrap payload.
    #[serde(rename = "is_collect", default)]
    pub is_favorite: bool,
}

impl MarketEntity {
    /// Reset user-local state for an entity arriving from the bootstrap source.
    pub fn from_snapshot(mut self) -> Self {
        self.is_favorite = false;
        self
    }
}
