//! Holdings recorded by the user and their instrument types.

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum InstrumentType {
    Stock,
    #[serde(rename = "ETF", alias = "Etf")]
    Etf,
    Crypto,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 3] = [
        InstrumentType::Stock,
        InstrumentType::Etf,
        InstrumentType::Crypto,
    ];
}

impl Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InstrumentType::Stock => "Stock",
                InstrumentType::Etf => "ETF",
                InstrumentType::Crypto => "Crypto",
            }
        )
    }
}

impl FromStr for InstrumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STOCK" => Ok(InstrumentType::Stock),
            "ETF" => Ok(InstrumentType::Etf),
            "CRYPTO" => Ok(InstrumentType::Crypto),
            _ => Err(anyhow!("Invalid instrument type: {}", s)),
        }
    }
}

/// Normalizes a symbol into the key used across one resolution batch.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A position recorded by the user. The engine only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub instrument_type: InstrumentType,
    pub quantity: f64,
    pub cost_basis_per_unit: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub exchange: String,
}

impl Holding {
    /// Creates a holding with a fresh id, normalizing the symbol and
    /// rejecting negative or non-finite amounts.
    pub fn new(
        symbol: &str,
        instrument_type: InstrumentType,
        quantity: f64,
        cost_basis_per_unit: f64,
    ) -> Result<Self> {
        Holding {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            instrument_type,
            quantity,
            cost_basis_per_unit,
            currency: String::new(),
            exchange: String::new(),
        }
        .validate()
    }

    /// Normalizes the symbol and currency and checks the amounts. Applied to
    /// holdings read back from disk, which bypass `new`.
    pub fn validate(mut self) -> Result<Self> {
        self.symbol = normalize_symbol(&self.symbol);
        if self.symbol.is_empty() {
            bail!("Holding symbol must not be empty");
        }
        check_amount("quantity", &self.symbol, self.quantity)?;
        check_amount("costBasisPerUnit", &self.symbol, self.cost_basis_per_unit)?;

        if self.id.trim().is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        let currency = self.currency.clone();
        let exchange = self.exchange.clone();
        Ok(self.with_currency(&currency).with_exchange(&exchange))
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.trim().to_uppercase();
        self
    }

    pub fn with_exchange(mut self, exchange: &str) -> Self {
        self.exchange = exchange.trim().to_string();
        self
    }

    /// True when both holdings describe the same position, ignoring ids.
    pub fn same_position(&self, other: &Holding) -> bool {
        self.symbol == other.symbol
            && self.instrument_type == other.instrument_type
            && self.quantity == other.quantity
            && self.cost_basis_per_unit == other.cost_basis_per_unit
            && self.currency == other.currency
            && self.exchange == other.exchange
    }
}

fn check_amount(field: &str, symbol: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("Invalid {field} for {symbol}: {value} (must be a non-negative number)");
    }
    Ok(())
}
