use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::cache::Cache;
use crate::core::price::{CryptoQuotable, CryptoTarget, QuoteError, SymbolQuote, positive_price};
use crate::providers::util::{endpoint_url, http_client, request_error, response_text};

const PROVIDER: &str = "CoinGecko";

/// Batched crypto prices from CoinGecko's `simple/price` endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
    client: Client,
    cache: Arc<Cache<String, HashMap<String, f64>>>,
    cache_ttl: Duration,
}

impl CoinGeckoProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Arc<Cache<String, HashMap<String, f64>>>,
        cache_ttl: Duration,
    ) -> Result<Self> {
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            cache,
            cache_ttl,
        })
    }

    /// Fetches `id -> price` for the given ids, keeping only usable prices.
    async fn fetch_prices(
        &self,
        targets: &[CryptoTarget],
        currency: &str,
    ) -> Result<HashMap<String, f64>, QuoteError> {
        let mut ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        let ids = ids.join(",");

        let cache_key = format!("{ids}:{currency}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let url = endpoint_url(
            PROVIDER,
            &self.base_url,
            "simple/price",
            &[("ids", ids.as_str()), ("vs_currencies", currency)],
        )?;
        debug!("Requesting crypto prices from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, e))?;
        let text = response_text(PROVIDER, response).await?;

        let body: HashMap<String, HashMap<String, Value>> =
            serde_json::from_str(&text).map_err(|e| QuoteError::Parse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let prices: HashMap<String, f64> = body
            .into_iter()
            .filter_map(|(id, by_currency)| {
                by_currency
                    .get(currency)
                    .and_then(Value::as_f64)
                    .and_then(positive_price)
                    .map(|price| (id, price))
            })
            .collect();

        self.cache
            .put(cache_key, prices.clone(), Some(self.cache_ttl))
            .await;
        Ok(prices)
    }
}

#[async_trait]
impl CryptoQuotable for CoinGeckoProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(
        name = "CoinGeckoBatchFetch",
        skip(self, targets),
        fields(count = targets.len(), currency = %currency)
    )]
    async fn fetch_batch(&self, targets: &[CryptoTarget], currency: &str) -> Vec<SymbolQuote> {
        if targets.is_empty() {
            return Vec::new();
        }

        let currency = currency.trim().to_lowercase();
        match self.fetch_prices(targets, &currency).await {
            Ok(prices) => targets
                .iter()
                .map(|target| match prices.get(&target.id) {
                    Some(price) => SymbolQuote::priced(&target.symbol, *price),
                    None => SymbolQuote::failed(
                        &target.symbol,
                        QuoteError::NotReturned {
                            provider: PROVIDER.to_string(),
                        },
                    ),
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Crypto batch failed, {} symbols unresolved", targets.len());
                targets
                    .iter()
                    .map(|target| SymbolQuote::failed(&target.symbol, e.clone()))
                    .collect()
            }
        }
    }
}
