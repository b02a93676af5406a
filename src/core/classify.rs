//! Splits requested symbols between the crypto and equity providers.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::holding::normalize_symbol;
use super::price::CryptoTarget;

const DEFAULT_CRYPTO_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("DOT", "polkadot"),
    ("LTC", "litecoin"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
    ("USDT", "tether"),
    ("USDC", "usd-coin"),
    ("BNB", "binancecoin"),
];

/// Maps symbols to crypto provider ids. Symbols absent from the table are
/// treated as equities.
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoIdTable(BTreeMap<String, String>);

impl CryptoIdTable {
    pub fn new<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        CryptoIdTable(
            entries
                .into_iter()
                .map(|(symbol, id)| {
                    (
                        normalize_symbol(symbol.as_ref()),
                        id.as_ref().trim().to_lowercase(),
                    )
                })
                .filter(|(symbol, id)| !symbol.is_empty() && !id.is_empty())
                .collect(),
        )
    }

    /// Built-in ids with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        table.0.extend(Self::new(overrides).0);
        table
    }

    pub fn id_for(&self, symbol: &str) -> Option<&str> {
        self.0.get(&normalize_symbol(symbol)).map(String::as_str)
    }
}

impl Default for CryptoIdTable {
    fn default() -> Self {
        Self::new(DEFAULT_CRYPTO_IDS.iter().copied())
    }
}

/// Requested symbols grouped by the provider that should price them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Every normalized symbol of the batch, in request order.
    pub requested: Vec<String>,
    pub crypto: Vec<CryptoTarget>,
    pub equities: Vec<String>,
}

/// Normalizes and de-duplicates `symbols`, then partitions them. Pure.
pub fn classify<S: AsRef<str>>(symbols: &[S], crypto_ids: &CryptoIdTable) -> Classification {
    let mut seen = HashSet::new();
    let mut classification = Classification::default();

    for symbol in symbols {
        let symbol = normalize_symbol(symbol.as_ref());
        if symbol.is_empty() || !seen.insert(symbol.clone()) {
            continue;
        }

        match crypto_ids.id_for(&symbol) {
            Some(id) => classification.crypto.push(CryptoTarget {
                symbol: symbol.clone(),
                id: id.to_string(),
            }),
            None => classification.equities.push(symbol.clone()),
        }
        classification.requested.push(symbol);
    }

    classification
}
