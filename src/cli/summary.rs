use super::ui;
use crate::core::holding::{Holding, InstrumentType};
use crate::core::price::PriceMap;
use crate::core::resolver::PriceResolver;
use crate::core::valuation::{Valuation, calculate_valuation};
use crate::store::HoldingsStore;
use anyhow::Result;
use comfy_table::Cell;
use std::time::Duration;
use tracing::{debug, info};

impl Valuation {
    pub fn display_as_table(&self, currency: &str) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Type"),
            ui::header_cell("Quantity"),
            ui::header_cell("Price"),
            ui::header_cell("Source"),
            ui::header_cell(&format!("Value ({currency})")),
            ui::header_cell("Cost"),
            ui::header_cell("P&L"),
            ui::header_cell("Weight (%)"),
        ]);

        for position in &self.positions {
            let price = position.price_source.value();
            table.add_row(vec![
                Cell::new(&position.symbol),
                Cell::new(position.instrument_type.to_string()),
                ui::number_cell(format!("{:.4}", position.quantity)),
                ui::format_optional_cell(price, |p| format!("{p:.2}")),
                ui::source_cell(&position.price_source),
                ui::number_cell(format!("{:.2}", position.value)),
                ui::number_cell(format!("{:.2}", position.cost)),
                ui::pnl_cell(format!("{:.2}", position.pnl), position.pnl),
                ui::format_optional_cell(position.weight, |w| format!("{w:.2}%")),
            ]);
        }

        let mut output = table.to_string();
        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text(currency, ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.current), ui::StyleType::TotalValue)
        ));
        output.push_str(&format!(
            "\nTotal Cost ({}): {:.2}",
            ui::style_text(currency, ui::StyleType::TotalLabel),
            self.cost
        ));
        let pnl_style = if self.pnl >= 0.0 {
            ui::StyleType::TotalValue
        } else {
            ui::StyleType::Error
        };
        output.push_str(&format!(
            "\nProfit/Loss: {}",
            ui::style_text(
                &format!("{:.2} ({:.2}%)", self.pnl, self.pnl_pct),
                pnl_style
            )
        ));

        output
    }

    pub fn display_allocation(&self, currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Type"),
            ui::header_cell(&format!("Value ({currency})")),
            ui::header_cell("Allocation (%)"),
        ]);

        for instrument_type in InstrumentType::ALL {
            let Some((_, value)) = self
                .allocation
                .iter()
                .find(|(t, _)| *t == instrument_type)
            else {
                continue;
            };
            table.add_row(vec![
                Cell::new(instrument_type.to_string()),
                ui::number_cell(format!("{value:.2}")),
                ui::format_optional_cell(self.allocation_pct(instrument_type), |p| {
                    format!("{p:.2}%")
                }),
            ]);
        }

        table.to_string()
    }
}

fn render(valuation: &Valuation, prices: &PriceMap, currency: &str) -> String {
    let mut output = format!(
        "Portfolio: {}\n\n",
        ui::style_text(&format!("{} holdings", valuation.positions.len()), ui::StyleType::Title)
    );
    output.push_str(&valuation.display_as_table(currency));
    if !valuation.allocation.is_empty() {
        output.push_str("\n\nAllocation\n");
        output.push_str(&valuation.display_allocation(currency));
    }
    output.push_str(&format!(
        "\n\n{}",
        ui::style_text(
            &format!(
                "Prices as of {}",
                prices.resolved_at().format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

/// Resolves prices for `holdings` and values them.
pub async fn value_holdings(
    holdings: &[Holding],
    resolver: &PriceResolver,
    currency: &str,
) -> (PriceMap, Valuation) {
    let pb = ui::new_spinner("Resolving prices...");
    let prices = resolver.resolve_holdings(holdings, currency).await;
    pb.finish_and_clear();

    let valuation = calculate_valuation(holdings, &prices, resolver.fallback());
    debug!(
        current = valuation.current,
        cost = valuation.cost,
        "Calculated valuation"
    );
    (prices, valuation)
}

pub async fn run(store: &HoldingsStore, resolver: &PriceResolver, currency: &str) -> Result<()> {
    let holdings = store.load()?;
    if holdings.is_empty() {
        println!(
            "No holdings recorded yet. Add one with `folio add` or `folio import <file>`."
        );
        return Ok(());
    }

    let (prices, valuation) = value_holdings(&holdings, resolver, currency).await;
    println!("{}", render(&valuation, &prices, currency));
    Ok(())
}

/// Re-renders the summary every `interval` until Ctrl-C. Each cycle builds
/// a new price map, so the screen always shows the latest completed one.
pub async fn watch(
    store: &HoldingsStore,
    resolver: &PriceResolver,
    currency: &str,
    interval: Duration,
) -> Result<()> {
    let term = console::Term::stdout();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
            _ = ticker.tick() => {
                let holdings = store.load()?;
                let (prices, valuation) = value_holdings(&holdings, resolver, currency).await;
                term.clear_screen()?;
                println!("{}", render(&valuation, &prices, currency));
                ui::print_separator();
                println!(
                    "{}",
                    ui::style_text(
                        &format!("Refreshing every {}s, Ctrl-C to stop", interval.as_secs()),
                        ui::StyleType::Subtle
                    )
                );
            }
        }
    }
}
