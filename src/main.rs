use anyhow::Result;
use clap::{Parser, Subcommand};
use folio::core::holding::InstrumentType;
use folio::core::log::init_logging;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for folio::AppCommand {
    fn from(cmd: Commands) -> folio::AppCommand {
        match cmd {
            Commands::Summary => folio::AppCommand::Summary,
            Commands::Prices => folio::AppCommand::Prices,
            Commands::Resolve { request } => folio::AppCommand::Resolve { request },
            Commands::Add {
                symbol,
                instrument_type,
                quantity,
                cost,
                currency,
                exchange,
            } => folio::AppCommand::Add(folio::NewHolding {
                symbol,
                instrument_type,
                quantity,
                cost_basis_per_unit: cost,
                currency,
                exchange,
            }),
            Commands::Remove { key } => folio::AppCommand::Remove { key },
            Commands::Import { file, append } => folio::AppCommand::Import { path: file, append },
            Commands::Export { file } => folio::AppCommand::Export { path: file },
            Commands::Watch { interval } => folio::AppCommand::Watch {
                interval: Duration::from_secs(interval.max(1)),
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio valuation and allocation
    Summary,
    /// Display resolved prices for all holdings
    Prices,
    /// Resolve a JSON request of symbols to prices
    Resolve {
        /// Request body; read from stdin when omitted
        #[arg(short, long)]
        request: Option<String>,
    },
    /// Record a new holding
    Add {
        #[arg(short, long)]
        symbol: String,
        /// Stock, ETF or Crypto
        #[arg(short = 't', long = "type")]
        instrument_type: InstrumentType,
        #[arg(short, long)]
        quantity: f64,
        /// Cost basis per unit
        #[arg(long)]
        cost: f64,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// Remove holdings by symbol or id
    Remove {
        /// Symbol or holding id
        key: String,
    },
    /// Import holdings from a CSV file
    Import {
        file: String,
        /// Add to the existing holdings instead of replacing them
        #[arg(long)]
        append: bool,
    },
    /// Export holdings as CSV
    Export {
        /// Output file; stdout when omitted
        file: Option<String>,
    },
    /// Refresh the summary periodically until Ctrl-C
    Watch {
        /// Seconds between refreshes
        #[arg(short, long, default_value_t = 60)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => folio::cli::setup::setup(),
        Some(cmd) => folio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => folio::run_command(folio::AppCommand::Summary, cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
