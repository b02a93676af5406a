//! Pricing abstractions and core types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use thiserror::Error;

use super::holding::normalize_symbol;

/// Returns the price if it is usable: finite and strictly positive.
pub fn positive_price(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Why a single symbol could not be priced by an upstream provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("no credential configured for {provider}")]
    MissingCredential { provider: String },
    #[error("{provider} request timed out")]
    Timeout { provider: String },
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} returned HTTP {status}")]
    Status { provider: String, status: u16 },
    #[error("failed to parse {provider} response: {message}")]
    Parse { provider: String, message: String },
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
    #[error("{provider} returned no price")]
    NotReturned { provider: String },
}

/// The outcome of quoting one requested symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolQuote {
    pub symbol: String,
    pub outcome: Result<f64, QuoteError>,
}

impl SymbolQuote {
    /// A successful quote. Non-finite or non-positive prices become
    /// `InvalidPrice` failures so they never reach a price map.
    pub fn priced(symbol: &str, price: f64) -> Self {
        SymbolQuote {
            symbol: normalize_symbol(symbol),
            outcome: positive_price(price).ok_or(QuoteError::InvalidPrice(price)),
        }
    }

    pub fn failed(symbol: &str, error: QuoteError) -> Self {
        SymbolQuote {
            symbol: normalize_symbol(symbol),
            outcome: Err(error),
        }
    }

    pub fn price(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// A crypto symbol paired with the id its provider knows it by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CryptoTarget {
    pub symbol: String,
    pub id: String,
}

/// A provider able to price many crypto ids in one batched call.
#[async_trait]
pub trait CryptoQuotable: Send + Sync {
    fn name(&self) -> &str;

    /// Returns one quote per target. Failures are reported per symbol and
    /// never as an error for the whole batch.
    async fn fetch_batch(&self, targets: &[CryptoTarget], currency: &str) -> Vec<SymbolQuote>;
}

/// A provider that prices equities one symbol per request.
#[async_trait]
pub trait EquityQuotable: Send + Sync {
    fn name(&self) -> &str;

    fn has_credential(&self) -> bool;

    /// Quotes `listing_symbol` and reports the outcome under `symbol`.
    async fn fetch_quote(&self, symbol: &str, listing_symbol: &str) -> SymbolQuote;
}

/// Where the price of a symbol came from in one resolution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ResolvedPrice {
    Live(f64),
    Fallback(f64),
    Unknown,
}

impl ResolvedPrice {
    pub fn value(&self) -> Option<f64> {
        match self {
            ResolvedPrice::Live(v) | ResolvedPrice::Fallback(v) => Some(*v),
            ResolvedPrice::Unknown => None,
        }
    }
}

impl Display for ResolvedPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ResolvedPrice::Live(_) => "live",
                ResolvedPrice::Fallback(_) => "fallback",
                ResolvedPrice::Unknown => "unknown",
            }
        )
    }
}

/// One resolved price per requested symbol. Built once per resolution
/// cycle and never modified afterwards.
#[derive(Debug, Clone)]
pub struct PriceMap {
    prices: BTreeMap<String, ResolvedPrice>,
    resolved_at: DateTime<Utc>,
}

impl PriceMap {
    pub(crate) fn new(prices: BTreeMap<String, ResolvedPrice>) -> Self {
        PriceMap {
            prices,
            resolved_at: Utc::now(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<ResolvedPrice> {
        self.prices.get(&normalize_symbol(symbol)).copied()
    }

    /// The usable price of `symbol`, if it resolved to one.
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).and_then(|p| p.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedPrice)> {
        self.prices.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.prices.keys()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Plain `symbol -> price` view with `None` for unknown symbols.
    pub fn to_values(&self) -> BTreeMap<String, Option<f64>> {
        self.prices
            .iter()
            .map(|(symbol, price)| (symbol.clone(), price.value()))
            .collect()
    }
}

/// Static last-known prices used when no live quote is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct FallbackTable(BTreeMap<String, f64>);

impl FallbackTable {
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.0.get(&normalize_symbol(symbol)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for FallbackTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        FallbackTable(
            iter.into_iter()
                .filter_map(|(symbol, price)| {
                    positive_price(price).map(|p| (normalize_symbol(symbol.as_ref()), p))
                })
                .collect(),
        )
    }
}

impl From<HashMap<String, f64>> for FallbackTable {
    fn from(map: HashMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<FallbackTable> for BTreeMap<String, f64> {
    fn from(table: FallbackTable) -> Self {
        table.0
    }
}
