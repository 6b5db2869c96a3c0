pub mod live_cache;
pub mod market;
pub mod market_cache;
pub mod query;
