use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::market_data::types::parse_number;
use crate::state::market::MarketEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    PairName,
    Volume24h,
    LastPrice,
    PriceChange24h,
    SortOrder,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::PairName,
        SortField::Volume24h,
        SortField::LastPrice,
        SortField::PriceChange24h,
        SortField::SortOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::PairName => "pair_name",
            SortField::Volume24h => "volume24h",
            SortField::LastPrice => "lastPrice",
            SortField::PriceChange24h => "priceChange24h",
            SortField::SortOrder => "sort_order",
        }
    }

    /// Map a field name to a sort field; unknown names mean "keep input order".
    pub fn lenient(name: &str) -> Option<SortField> {
        name.parse().ok()
    }

    fn compare(&self, a: &MarketEntity, b: &MarketEntity) -> Ordering {
        match self {
            SortField::PairName => a.pair_name.cmp(&b.pair_name),
            SortField::SortOrder => a.sort_order.cmp(&b.sort_order),
            SortField::Volume24h => compare_text(&a.ticker.volume, &b.ticker.volume),
            SortField::LastPrice => compare_text(&a.ticker.last_price, &b.ticker.last_price),
            SortField::PriceChange24h => compare_text(
                &a.ticker.price_change_percent,
                &b.ticker.price_change_percent,
            ),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown sort field: {s}"))
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Numeric comparison of text fields. Unparseable values sort after every
/// parseable one regardless of direction, and tie with each other.
fn compare_text(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn is_numeric(field: SortField, entity: &MarketEntity) -> bool {
    match field {
        SortField::Volume24h => parse_number(&entity.ticker.volume).is_some(),
        SortField::LastPrice => parse_number(&entity.ticker.last_price).is_some(),
        SortField::PriceChange24h => parse_number(&entity.ticker.price_change_percent).is_some(),
        SortField::PairName | SortField::SortOrder => true,
    }
}

/// Stable sort in place. `None` leaves the input order untouched.
pub fn sort_entities(entities: &mut [MarketEntity], field: Option<SortField>, order: SortOrder) {
    let Some(field) = field else { return };

    entities.sort_by(|a, b| {
        // Unparseable values stay at the tail in both directions.
        match (is_numeric(field, a), is_numeric(field, b)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => return Ordering::Equal,
            (true, true) => {}
        }
        match order {
            SortOrder::Asc => field.compare(a, b),
            SortOrder::Desc => field.compare(b, a),
        }
    });
}

/// Truncate to `limit` when it is present and positive.
pub fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit.filter(|n| *n > 0) {
        items.truncate(n);
    }
    items
}

/// Case-insensitive substring match; prefix matches first, input order kept
/// within each rank.
pub fn fuzzy_rank<'a>(
    entities: impl IntoIterator<Item = &'a MarketEntity>,
    query: &str,
) -> Vec<MarketEntity> {
    let needle = query.to_lowercase();
    let mut prefix = Vec::new();
    let mut contains = Vec::new();

    for entity in entities {
        let name = entity.pair_name.to_lowercase();
        if name.starts_with(&needle) {
            prefix.push(entity.clone());
        } else if name.contains(&needle) {
            contains.push(entity.clone());
        }
    }

    prefix.extend(contains);
    prefix
}
