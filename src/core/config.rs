use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::price::FallbackTable;

pub const FINNHUB_API_KEY_ENV: &str = "FINNHUB_API_KEY";

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// How long a batched crypto response may be served from memory.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FinnhubConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Upstream providers to query. A provider without a section is never
/// called.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoConfig>,
    pub finnhub: Option<FinnhubConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
                cache_ttl_secs: default_cache_ttl_secs(),
            }),
            finnhub: Some(FinnhubConfig {
                base_url: "https://finnhub.io/api/v1".to_string(),
                api_key: None,
            }),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Base currency passed to providers and used for display.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_true")]
    pub use_live_prices: bool,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Extra symbol to CoinGecko id mappings, layered over the built-in ones.
    #[serde(default)]
    pub crypto_ids: HashMap<String, String>,
    /// Extra symbol to provider listing mappings, e.g. `DOL: DOL.TO`.
    #[serde(default)]
    pub ticker_overrides: HashMap<String, String>,
    #[serde(default)]
    pub fallback_prices: FallbackTable,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            use_live_prices: true,
            providers: ProvidersConfig::default(),
            crypto_ids: HashMap::new(),
            ticker_overrides: HashMap::new(),
            fallback_prices: FallbackTable::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn holdings_path(&self) -> Result<PathBuf> {
        Ok(self.default_data_path()?.join("holdings.yaml"))
    }

    /// The Finnhub token from the config file, else from `FINNHUB_API_KEY`.
    pub fn finnhub_api_key(&self) -> Option<String> {
        self.providers
            .finnhub
            .as_ref()
            .and_then(|f| f.api_key.clone())
            .or_else(|| std::env::var(FINNHUB_API_KEY_ENV).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
