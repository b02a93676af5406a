//! JSON batch resolution: `{symbols, baseCurrency}` in, `{prices}` out.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::resolver::PriceResolver;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub symbols: Vec<String>,
    pub base_currency: String,
}

/// Prices keyed by requested symbol; `null` marks a symbol with no live or
/// fallback price. `error` is only set for a request that could not be
/// read, in which case `prices` is empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResolveResponse {
    pub prices: BTreeMap<String, Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolveResponse {
    pub fn rejected(message: String) -> Self {
        ResolveResponse {
            prices: BTreeMap::new(),
            error: Some(message),
        }
    }
}

pub fn parse_request(body: &str) -> Result<ResolveRequest> {
    let request: ResolveRequest =
        serde_json::from_str(body).context("Malformed resolution request")?;
    if request.base_currency.trim().is_empty() {
        bail!("Malformed resolution request: baseCurrency must not be empty");
    }
    Ok(request)
}

/// Answers a raw request body. Never fails: a body that cannot be read
/// yields a response carrying the error and no prices.
///
/// Keys are the requested symbols trimmed and uppercased, one per distinct
/// symbol. Blank symbols are not priced and get no key.
pub async fn handle_request(resolver: &PriceResolver, body: &str) -> ResolveResponse {
    let request = match parse_request(body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Rejected resolution request");
            return ResolveResponse::rejected(format!("{e:#}"));
        }
    };
    debug!(?request, "Handling resolution request");

    let prices = resolver
        .resolve(&request.symbols, &request.base_currency)
        .await;
    ResolveResponse {
        prices: prices.to_values(),
        error: None,
    }
}
