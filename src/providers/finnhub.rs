use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{EquityQuotable, QuoteError, SymbolQuote};
use crate::providers::util::{endpoint_url, http_client, request_error, response_text};

const PROVIDER: &str = "Finnhub";

/// Equity quotes from Finnhub's `/quote` endpoint, one request per symbol.
pub struct FinnhubProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl FinnhubProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(FinnhubProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }

    async fn fetch_current_price(
        &self,
        api_key: &str,
        listing_symbol: &str,
    ) -> Result<f64, QuoteError> {
        let url = endpoint_url(
            PROVIDER,
            &self.base_url,
            "quote",
            &[("symbol", listing_symbol)],
        )?;
        debug!("Requesting quote from {}", url);

        let response = self
            .client
            .get(url)
            .header("X-Finnhub-Token", api_key)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER, e))?;
        let text = response_text(PROVIDER, response).await?;

        let quote: QuoteResponse = serde_json::from_str(&text).map_err(|e| QuoteError::Parse {
            provider: PROVIDER.to_string(),
            message: format!("{e} for {listing_symbol}"),
        })?;

        quote.c.ok_or_else(|| QuoteError::NotReturned {
            provider: PROVIDER.to_string(),
        })
    }
}

/// Only the current price is read; Finnhub sends `0` for unknown symbols.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    c: Option<f64>,
}

#[async_trait]
impl EquityQuotable for FinnhubProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    #[instrument(
        name = "FinnhubQuoteFetch",
        skip(self),
        fields(symbol = %symbol, listing = %listing_symbol)
    )]
    async fn fetch_quote(&self, symbol: &str, listing_symbol: &str) -> SymbolQuote {
        let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) else {
            return SymbolQuote::failed(
                symbol,
                QuoteError::MissingCredential {
                    provider: PROVIDER.to_string(),
                },
            );
        };

        match self.fetch_current_price(api_key, listing_symbol).await {
            Ok(price) => SymbolQuote::priced(symbol, price),
            Err(e) => {
                debug!(error = %e, "Quote failed");
                SymbolQuote::failed(symbol, e)
            }
        }
    }
}
