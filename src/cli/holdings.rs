use crate::NewHolding;
use crate::core::holding::Holding;
use crate::store::HoldingsStore;
use crate::store::interchange::{export_holdings, import_holdings};
use anyhow::{Context, Result, bail};
use std::fs;
use tracing::info;

pub fn add(store: &HoldingsStore, new_holding: NewHolding) -> Result<()> {
    let mut holding = Holding::new(
        &new_holding.symbol,
        new_holding.instrument_type,
        new_holding.quantity,
        new_holding.cost_basis_per_unit,
    )?;
    if let Some(currency) = &new_holding.currency {
        holding = holding.with_currency(currency);
    }
    if let Some(exchange) = &new_holding.exchange {
        holding = holding.with_exchange(exchange);
    }

    info!(symbol = %holding.symbol, id = %holding.id, "Adding holding");
    let summary = format!("Added {} {} ({})", holding.quantity, holding.symbol, holding.id);
    store.add(holding)?;
    println!("{summary}");
    Ok(())
}

pub fn remove(store: &HoldingsStore, key: &str) -> Result<()> {
    let removed = store.remove(key)?;
    if removed == 0 {
        bail!("No holding matches '{key}'");
    }
    println!("Removed {removed} holding(s)");
    Ok(())
}

/// Imports a CSV file. Nothing is written unless every row is valid.
pub fn import(store: &HoldingsStore, path: &str, append: bool) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read CSV file: {path}"))?;
    let imported = import_holdings(&text)?;
    let count = imported.len();

    let holdings = if append {
        let mut holdings = store.load()?;
        holdings.extend(imported);
        holdings
    } else {
        imported
    };
    store.save(&holdings)?;

    info!(count, append, "Imported holdings from {path}");
    println!("Imported {count} holding(s)");
    Ok(())
}

pub fn export(store: &HoldingsStore, path: Option<&str>) -> Result<()> {
    let holdings = store.load()?;
    let text = export_holdings(&holdings)?;

    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write CSV file: {path}"))?;
            info!(count = holdings.len(), "Exported holdings to {path}");
        }
        None => print!("{text}"),
    }
    Ok(())
}
