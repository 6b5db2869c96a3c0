//! Live market ticker cache: REST bootstrap, websocket updates, and
//! sorted / searched / favorited read views over the tracked pairs.

pub mod config;
pub mod error;
pub mod market_data;
pub mod metrics;
pub mod state;

pub use config::Config;
pub use error::{BootstrapError, FetchError, StreamError};
pub use market_data::types::Ticker;
pub use state::market::MarketEntity;
pub use state::live_cache::{BootstrapOutcome, LifecycleState, LiveCache};
pub use state::market_cache::{MarketCache, MergePolicy, UpdateOutcome};
pub use state::query::{SortField, SortOrder};
