//! Merges provider quotes and fallback prices into one price per symbol.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::holding::normalize_symbol;
use super::price::{FallbackTable, PriceMap, ResolvedPrice, SymbolQuote};

/// Builds the price map for `requested`, preferring a live quote, then the
/// fallback table, then `Unknown`. Every requested symbol gets exactly one
/// entry; quotes for symbols that were not requested are ignored.
pub fn reconcile<S: AsRef<str>>(
    requested: &[S],
    crypto: Vec<SymbolQuote>,
    equities: Vec<SymbolQuote>,
    fallback: &FallbackTable,
) -> PriceMap {
    let mut live = HashMap::new();
    for quote in crypto.into_iter().chain(equities) {
        match quote.price() {
            Some(price) => {
                live.insert(quote.symbol, price);
            }
            None => {
                if let Err(e) = &quote.outcome {
                    debug!(symbol = %quote.symbol, error = %e, "Unresolved live quote");
                }
            }
        }
    }

    let prices: BTreeMap<String, ResolvedPrice> = requested
        .iter()
        .map(|symbol| normalize_symbol(symbol.as_ref()))
        .filter(|symbol| !symbol.is_empty())
        .map(|symbol| {
            let resolved = match (live.get(&symbol), fallback.get(&symbol)) {
                (Some(price), _) => ResolvedPrice::Live(*price),
                (None, Some(price)) => ResolvedPrice::Fallback(price),
                (None, None) => ResolvedPrice::Unknown,
            };
            (symbol, resolved)
        })
        .collect();

    PriceMap::new(prices)
}
