use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::market_data::types::Ticker;
use crate::state::market::MarketEntity;
use crate::state::query::{self, SortField, SortOrder};

/// How an incoming ticker is reconciled with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Replace unconditionally, in arrival order.
    #[default]
    LastWriterWins,
    /// Drop updates whose event time is strictly older than the stored one.
    RejectStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    UnknownPair,
    Stale,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Applied => "applied",
            UpdateOutcome::UnknownPair => "unknown_pair",
            UpdateOutcome::Stale => "stale",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entities: Vec<MarketEntity>,
    /// pair_name -> position in `entities`; fixed after population
    index: HashMap<String, usize>,
    last_update: Option<SystemTime>,
}

impl Inner {
    fn position(&self, pair_name: &str) -> Option<usize> {
        self.index.get(pair_name).copied()
    }
}

/// The tracked entity list behind a single lock.
///
/// Every mutation and every read holds the lock for one full pass, so readers
/// never see a half-applied update. All list-returning reads hand out clones.
#[derive(Debug, Default)]
pub struct MarketCache {
    inner: RwLock<Inner>,
    policy: MergePolicy,
}

impl MarketCache {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }

    /// Replace the list wholesale with the bootstrap result. Favorites are
    /// reset and duplicate pair names keep their first occurrence.
    pub fn populate(&self, entities: Vec<MarketEntity>) -> usize {
        let mut inner = self.inner.write();
        inner.entities.clear();
        inner.index.clear();

        for entity in entities {
            if inner.index.contains_key(&entity.pair_name) {
                warn!(pair = %entity.pair_name, "duplicate pair in snapshot, keeping first");
                continue;
            }
            let position = inner.entities.len();
            inner.index.insert(entity.pair_name.clone(), position);
            inner.entities.push(entity.from_snapshot());
        }

        inner.entities.len()
    }

    /// Pair names in list order.
    pub fn pair_names(&self) -> Vec<String> {
        self.inner
            .read()
            .entities
            .iter()
            .map(|e| e.pair_name.clone())
            .collect()
    }

    /// Apply one streamed ticker to the entity named by its symbol.
    pub fn apply_ticker(&self, ticker: Ticker) -> UpdateOutcome {
        let mut inner = self.inner.write();

        let Some(position) = inner.position(&ticker.symbol) else {
            debug!(symbol = %ticker.symbol, "ticker for untracked pair discarded");
            return UpdateOutcome::UnknownPair;
        };

        if self.policy == MergePolicy::RejectStale {
            let stored = &inner.entities[position].ticker;
            if let (Some(incoming), Some(current)) = (ticker.event_time_ms(), stored.event_time_ms()) {
                if incoming < current {
                    debug!(symbol = %ticker.symbol, incoming, current, "stale ticker discarded");
                    return UpdateOutcome::Stale;
                }
            }
        }

        inner.entities[position].ticker = ticker;
        inner.last_update = Some(SystemTime::now());
        UpdateOutcome::Applied
    }

    /// Copy of the list sorted by `field`; `None` keeps list order.
    pub fn get_market_data(
        &self,
        field: Option<SortField>,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Vec<MarketEntity> {
        let mut snapshot = self.inner.read().entities.clone();
        query::sort_entities(&mut snapshot, field, order);
        query::apply_limit(snapshot, limit)
    }

    pub fn get_default_sorted_data(&self, limit: Option<usize>) -> Vec<MarketEntity> {
        self.get_market_data(Some(SortField::SortOrder), SortOrder::Asc, limit)
    }

    pub fn get_total_count(&self) -> usize {
        self.inner.read().entities.len()
    }

    pub fn fuzzy_search(&self, query: &str, limit: Option<usize>) -> Vec<MarketEntity> {
        let hits = query::fuzzy_rank(&self.inner.read().entities, query);
        query::apply_limit(hits, limit)
    }

    /// Flip the favorite flag and return its new value; unknown pairs yield `false`.
    pub fn toggle_favorite(&self, pair_name: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.position(pair_name) {
            Some(position) => {
                let entity = &mut inner.entities[position];
                entity.is_favorite = !entity.is_favorite;
                entity.is_favorite
            }
            None => false,
        }
    }

    pub fn get_favorites(&self) -> Vec<MarketEntity> {
        self.inner
            .read()
            .entities
            .iter()
            .filter(|e| e.is_favorite)
            .cloned()
            .collect()
    }

    pub fn is_favorite(&self, pair_name: &str) -> bool {
        let inner = self.inner.read();
        inner
            .position(pair_name)
            .is_some_and(|position| inner.entities[position].is_favorite)
    }

    /// Wall-clock time of the last applied stream update.
    pub fn last_update(&self) -> Option<SystemTime> {
        self.inner.read().last_update
    }
}
