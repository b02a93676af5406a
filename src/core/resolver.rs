//! One price resolution cycle: classify, quote concurrently, reconcile.

use anyhow::Result;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::core::cache::Cache;
use crate::core::classify::{CryptoIdTable, classify};
use crate::core::config::AppConfig;
use crate::core::holding::{Holding, normalize_symbol};
use crate::core::price::{
    CryptoQuotable, CryptoTarget, EquityQuotable, FallbackTable, PriceMap, QuoteError, SymbolQuote,
};
use crate::core::reconcile::reconcile;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::finnhub::FinnhubProvider;

const DEFAULT_TICKER_OVERRIDES: &[(&str, &str)] = &[
    ("DOL", "DOL.TO"),
    ("VFV", "VFV.TO"),
    ("XEQT", "XEQT.TO"),
    ("VEQT", "VEQT.TO"),
    ("RY", "RY.TO"),
    ("TD", "TD.TO"),
    ("SHOP", "SHOP.TO"),
];

/// Maps canonical symbols to the ticker an equity provider lists them
/// under, e.g. a Toronto listing with a `.TO` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerOverrides(BTreeMap<String, String>);

impl TickerOverrides {
    pub fn new<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        TickerOverrides(
            entries
                .into_iter()
                .map(|(symbol, listing)| {
                    (
                        normalize_symbol(symbol.as_ref()),
                        listing.as_ref().trim().to_string(),
                    )
                })
                .filter(|(symbol, listing)| !symbol.is_empty() && !listing.is_empty())
                .collect(),
        )
    }

    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        table.0.extend(Self::new(overrides).0);
        table
    }

    pub fn listing_symbol(&self, symbol: &str) -> String {
        let symbol = normalize_symbol(symbol);
        self.0.get(&symbol).cloned().unwrap_or(symbol)
    }
}

impl Default for TickerOverrides {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER_OVERRIDES.iter().copied())
    }
}

/// Produces a fresh `PriceMap` per call from the configured providers and
/// the fallback table. Holds no state between cycles apart from the
/// providers' own response caches.
pub struct PriceResolver {
    crypto: Option<Arc<dyn CryptoQuotable>>,
    equity: Option<Arc<dyn EquityQuotable>>,
    crypto_ids: CryptoIdTable,
    ticker_overrides: TickerOverrides,
    fallback: FallbackTable,
    call_timeout: Duration,
}

impl PriceResolver {
    /// A resolver without providers: every symbol resolves from `fallback`.
    pub fn new(fallback: FallbackTable) -> Self {
        PriceResolver {
            crypto: None,
            equity: None,
            crypto_ids: CryptoIdTable::default(),
            ticker_overrides: TickerOverrides::default(),
            fallback,
            call_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let call_timeout = Duration::from_secs(config.providers.timeout_secs.max(1));
        let mut resolver = PriceResolver::new(config.fallback_prices.clone())
            .with_crypto_ids(CryptoIdTable::with_overrides(&config.crypto_ids))
            .with_ticker_overrides(TickerOverrides::with_overrides(&config.ticker_overrides))
            .with_call_timeout(call_timeout);

        if !config.use_live_prices {
            info!("Live prices disabled, using fallback prices only");
            return Ok(resolver);
        }

        if let Some(coingecko) = &config.providers.coingecko {
            let provider = CoinGeckoProvider::new(
                &coingecko.base_url,
                call_timeout,
                Arc::new(Cache::new()),
                Duration::from_secs(coingecko.cache_ttl_secs),
            )?;
            resolver = resolver.with_crypto_provider(Arc::new(provider));
        }

        if let Some(finnhub) = &config.providers.finnhub {
            let provider =
                FinnhubProvider::new(&finnhub.base_url, config.finnhub_api_key(), call_timeout)?;
            resolver = resolver.with_equity_provider(Arc::new(provider));
        }

        Ok(resolver)
    }

    pub fn with_crypto_provider(mut self, provider: Arc<dyn CryptoQuotable>) -> Self {
        self.crypto = Some(provider);
        self
    }

    pub fn with_equity_provider(mut self, provider: Arc<dyn EquityQuotable>) -> Self {
        self.equity = Some(provider);
        self
    }

    pub fn with_crypto_ids(mut self, crypto_ids: CryptoIdTable) -> Self {
        self.crypto_ids = crypto_ids;
        self
    }

    pub fn with_ticker_overrides(mut self, ticker_overrides: TickerOverrides) -> Self {
        self.ticker_overrides = ticker_overrides;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn fallback(&self) -> &FallbackTable {
        &self.fallback
    }

    /// Resolves every requested symbol. The crypto batch and each equity
    /// quote run concurrently; a failure only affects its own symbols.
    #[instrument(name = "ResolvePrices", skip(self, symbols), fields(count = symbols.len()))]
    pub async fn resolve<S: AsRef<str>>(&self, symbols: &[S], currency: &str) -> PriceMap {
        let classification = classify(symbols, &self.crypto_ids);
        debug!(
            crypto = classification.crypto.len(),
            equities = classification.equities.len(),
            "Classified symbols"
        );

        let (crypto, equities) = tokio::join!(
            self.crypto_quotes(&classification.crypto, currency),
            self.equity_quotes(&classification.equities),
        );

        reconcile(&classification.requested, crypto, equities, &self.fallback)
    }

    /// Resolves the symbols of `holdings`.
    pub async fn resolve_holdings(&self, holdings: &[Holding], currency: &str) -> PriceMap {
        let symbols: Vec<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        self.resolve(&symbols, currency).await
    }

    async fn crypto_quotes(&self, targets: &[CryptoTarget], currency: &str) -> Vec<SymbolQuote> {
        if targets.is_empty() {
            return Vec::new();
        }
        let Some(provider) = &self.crypto else {
            debug!("No crypto provider configured");
            return Vec::new();
        };

        match timeout(self.call_timeout, provider.fetch_batch(targets, currency)).await {
            Ok(quotes) => quotes,
            Err(_) => {
                warn!("{} batch timed out after {:?}", provider.name(), self.call_timeout);
                targets
                    .iter()
                    .map(|target| {
                        SymbolQuote::failed(
                            &target.symbol,
                            QuoteError::Timeout {
                                provider: provider.name().to_string(),
                            },
                        )
                    })
                    .collect()
            }
        }
    }

    async fn equity_quotes(&self, symbols: &[String]) -> Vec<SymbolQuote> {
        if symbols.is_empty() {
            return Vec::new();
        }
        let Some(provider) = &self.equity else {
            debug!("No equity provider configured");
            return Vec::new();
        };

        if !provider.has_credential() {
            info!(
                "No {} credential configured, leaving {} equity symbols unresolved",
                provider.name(),
                symbols.len()
            );
            return symbols
                .iter()
                .map(|symbol| {
                    SymbolQuote::failed(
                        symbol,
                        QuoteError::MissingCredential {
                            provider: provider.name().to_string(),
                        },
                    )
                })
                .collect();
        }

        let quote_futures = symbols.iter().map(|symbol| {
            let listing = self.ticker_overrides.listing_symbol(symbol);
            async move {
                match timeout(self.call_timeout, provider.fetch_quote(symbol, &listing)).await {
                    Ok(quote) => quote,
                    Err(_) => {
                        warn!("{} quote for {} timed out", provider.name(), listing);
                        SymbolQuote::failed(
                            symbol,
                            QuoteError::Timeout {
                                provider: provider.name().to_string(),
                            },
                        )
                    }
                }
            }
        });

        join_all(quote_futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::ResolvedPrice;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockCryptoProvider {
        prices: HashMap<String, f64>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockCryptoProvider {
        fn new(prices: &[(&str, f64)]) -> Self {
            MockCryptoProvider {
                prices: prices.iter().map(|(id, p)| (id.to_string(), *p)).collect(),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl CryptoQuotable for MockCryptoProvider {
        fn name(&self) -> &str {
            "MockCrypto"
        }

        async fn fetch_batch(
            &self,
            targets: &[CryptoTarget],
            _currency: &str,
        ) -> Vec<SymbolQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            targets
                .iter()
                .filter_map(|t| self.prices.get(&t.id).map(|p| SymbolQuote::priced(&t.symbol, *p)))
                .collect()
        }
    }

    struct MockEquityProvider {
        prices: HashMap<String, f64>,
        failing: HashSet<String>,
        hanging: HashSet<String>,
        credential: bool,
        requested: Mutex<Vec<String>>,
    }

    impl MockEquityProvider {
        fn new(prices: &[(&str, f64)]) -> Self {
            MockEquityProvider {
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
                failing: HashSet::new(),
                hanging: HashSet::new(),
                credential: true,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            let mut requested = self.requested.lock().unwrap().clone();
            requested.sort();
            requested
        }
    }

    #[async_trait]
    impl EquityQuotable for MockEquityProvider {
        fn name(&self) -> &str {
            "MockEquity"
        }

        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn fetch_quote(&self, symbol: &str, listing_symbol: &str) -> SymbolQuote {
            self.requested.lock().unwrap().push(listing_symbol.to_string());
            if self.hanging.contains(listing_symbol) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing.contains(listing_symbol) {
                return SymbolQuote::failed(
                    symbol,
                    QuoteError::Status {
                        provider: "MockEquity".to_string(),
                        status: 500,
                    },
                );
            }
            match self.prices.get(listing_symbol) {
                Some(price) => SymbolQuote::priced(symbol, *price),
                None => SymbolQuote::failed(
                    symbol,
                    QuoteError::NotReturned {
                        provider: "MockEquity".to_string(),
                    },
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_equity_credential_leaves_crypto_unaffected() {
        let crypto = Arc::new(MockCryptoProvider::new(&[("bitcoin", 62000.0)]));
        let mut equity = MockEquityProvider::new(&[("AAPL", 190.0)]);
        equity.credential = false;
        let equity = Arc::new(equity);

        let resolver = PriceResolver::new(FallbackTable::default())
            .with_crypto_provider(crypto.clone())
            .with_equity_provider(equity.clone());

        let prices = resolver.resolve(&["AAPL", "BTC"], "USD").await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get("BTC"), Some(ResolvedPrice::Live(62000.0)));
        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Unknown));
        assert!(equity.requested().is_empty());
        assert_eq!(crypto.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_equity_quote_does_not_affect_siblings() {
        let mut equity = MockEquityProvider::new(&[("AAPL", 190.0), ("MSFT", 410.0)]);
        equity.failing.insert("AAPL".to_string());
        let fallback: FallbackTable = [("AAPL", 180.0)].into_iter().collect();

        let resolver = PriceResolver::new(fallback).with_equity_provider(Arc::new(equity));
        let prices = resolver.resolve(&["AAPL", "MSFT"], "USD").await;

        assert_eq!(prices.get("MSFT"), Some(ResolvedPrice::Live(410.0)));
        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Fallback(180.0)));
    }

    #[tokio::test]
    async fn test_failed_equity_quote_without_fallback_is_unknown() {
        let mut equity = MockEquityProvider::new(&[("MSFT", 410.0)]);
        equity.failing.insert("AAPL".to_string());

        let resolver =
            PriceResolver::new(FallbackTable::default()).with_equity_provider(Arc::new(equity));
        let prices = resolver.resolve(&["AAPL", "MSFT"], "USD").await;

        assert_eq!(prices.get("MSFT"), Some(ResolvedPrice::Live(410.0)));
        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Unknown));
    }

    #[tokio::test]
    async fn test_ticker_overrides_applied_to_equity_requests() {
        let equity = Arc::new(MockEquityProvider::new(&[("DOL.TO", 131.0), ("AAPL", 190.0)]));
        let resolver =
            PriceResolver::new(FallbackTable::default()).with_equity_provider(equity.clone());

        let prices = resolver.resolve(&["dol", "AAPL"], "CAD").await;

        assert_eq!(equity.requested(), vec!["AAPL", "DOL.TO"]);
        assert_eq!(prices.get("DOL"), Some(ResolvedPrice::Live(131.0)));
        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Live(190.0)));
    }

    #[tokio::test]
    async fn test_hung_equity_call_times_out_alone() {
        let mut equity = MockEquityProvider::new(&[("MSFT", 410.0)]);
        equity.hanging.insert("AAPL".to_string());
        let crypto = Arc::new(MockCryptoProvider::new(&[("ethereum", 3000.0)]));

        let resolver = PriceResolver::new(FallbackTable::default())
            .with_crypto_provider(crypto)
            .with_equity_provider(Arc::new(equity))
            .with_call_timeout(Duration::from_millis(100));

        let prices = resolver.resolve(&["AAPL", "MSFT", "ETH"], "USD").await;

        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Unknown));
        assert_eq!(prices.get("MSFT"), Some(ResolvedPrice::Live(410.0)));
        assert_eq!(prices.get("ETH"), Some(ResolvedPrice::Live(3000.0)));
    }

    #[tokio::test]
    async fn test_slow_crypto_batch_times_out_to_fallback() {
        let mut crypto = MockCryptoProvider::new(&[("bitcoin", 62000.0)]);
        crypto.delay = Some(Duration::from_secs(60));
        let fallback: FallbackTable = [("BTC", 60000.0)].into_iter().collect();

        let resolver = PriceResolver::new(fallback)
            .with_crypto_provider(Arc::new(crypto))
            .with_equity_provider(Arc::new(MockEquityProvider::new(&[("AAPL", 190.0)])))
            .with_call_timeout(Duration::from_millis(100));

        let prices = resolver.resolve(&["BTC", "AAPL"], "USD").await;

        assert_eq!(prices.get("BTC"), Some(ResolvedPrice::Fallback(60000.0)));
        assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Live(190.0)));
    }

    #[tokio::test]
    async fn test_no_providers_uses_fallback_only() {
        let fallback: FallbackTable = [("DOL", 130.0)].into_iter().collect();
        let resolver = PriceResolver::new(fallback);

        let prices = resolver.resolve(&["DOL", "BTC", "dol"], "USD").await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get("DOL"), Some(ResolvedPrice::Fallback(130.0)));
        assert_eq!(prices.get("BTC"), Some(ResolvedPrice::Unknown));
    }

    #[tokio::test]
    async fn test_resolve_holdings_uses_holding_symbols() {
        let holdings = vec![
            Holding::new("BTC", crate::core::holding::InstrumentType::Crypto, 1.0, 1.0).unwrap(),
            Holding::new("BTC", crate::core::holding::InstrumentType::Crypto, 2.0, 1.0).unwrap(),
        ];
        let crypto = Arc::new(MockCryptoProvider::new(&[("bitcoin", 62000.0)]));
        let resolver = PriceResolver::new(FallbackTable::default()).with_crypto_provider(crypto);

        let prices = resolver.resolve_holdings(&holdings, "USD").await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.price("BTC"), Some(62000.0));
    }

    #[test]
    fn test_ticker_overrides_table() {
        let overrides = HashMap::from([("xeqt".to_string(), "XEQT.NE".to_string())]);
        let table = TickerOverrides::with_overrides(&overrides);
        assert_eq!(table.listing_symbol("XEQT"), "XEQT.NE");
        assert_eq!(table.listing_symbol("dol"), "DOL.TO");
        assert_eq!(table.listing_symbol("aapl"), "AAPL");
    }

    #[test]
    fn test_from_config_respects_live_price_switch() {
        let config = AppConfig {
            use_live_prices: false,
            ..AppConfig::default()
        };
        let resolver = PriceResolver::from_config(&config).unwrap();
        assert!(resolver.crypto.is_none());
        assert!(resolver.equity.is_none());

        let resolver = PriceResolver::from_config(&AppConfig::default()).unwrap();
        assert!(resolver.crypto.is_some());
        assert!(resolver.equity.is_some());
    }
}
