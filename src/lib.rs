pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::holding::InstrumentType;
use crate::core::resolver::PriceResolver;
use crate::store::HoldingsStore;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

/// A holding as entered on the command line.
#[derive(Debug, Clone)]
pub struct NewHolding {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub quantity: f64,
    pub cost_basis_per_unit: f64,
    pub currency: Option<String>,
    pub exchange: Option<String>,
}

pub enum AppCommand {
    Summary,
    Prices,
    /// Answer a JSON resolution request; read from stdin when `None`.
    Resolve {
        request: Option<String>,
    },
    Add(NewHolding),
    Remove {
        key: String,
    },
    Import {
        path: String,
        append: bool,
    },
    Export {
        path: Option<String>,
    },
    Watch {
        interval: Duration,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("folio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        currency = %config.currency,
        use_live_prices = config.use_live_prices,
        "Loaded config"
    );

    let store = HoldingsStore::new(config.holdings_path()?);

    match command {
        AppCommand::Summary => {
            let resolver = PriceResolver::from_config(&config)?;
            cli::summary::run(&store, &resolver, &config.currency).await
        }
        AppCommand::Prices => {
            let resolver = PriceResolver::from_config(&config)?;
            cli::prices::run(&store, &resolver, &config.currency).await
        }
        AppCommand::Resolve { request } => {
            let resolver = PriceResolver::from_config(&config)?;
            cli::resolve::run(&resolver, request).await
        }
        AppCommand::Watch { interval } => {
            let resolver = PriceResolver::from_config(&config)?;
            cli::summary::watch(&store, &resolver, &config.currency, interval).await
        }
        AppCommand::Add(new_holding) => cli::holdings::add(&store, new_holding),
        AppCommand::Remove { key } => cli::holdings::remove(&store, &key),
        AppCommand::Import { path, append } => cli::holdings::import(&store, &path, append),
        AppCommand::Export { path } => cli::holdings::export(&store, path.as_deref()),
    }
}
