use super::ui;
use crate::core::price::PriceMap;
use crate::core::resolver::PriceResolver;
use crate::store::HoldingsStore;
use anyhow::Result;
use comfy_table::Cell;

impl PriceMap {
    pub fn display_as_table(&self, currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell(&format!("Price ({currency})")),
            ui::header_cell("Source"),
        ]);

        for (symbol, price) in self.iter() {
            table.add_row(vec![
                Cell::new(symbol),
                ui::format_optional_cell(price.value(), |p| format!("{p:.2}")),
                ui::source_cell(price),
            ]);
        }

        format!(
            "{table}\n{}",
            ui::style_text(
                &format!(
                    "Resolved at {}",
                    self.resolved_at().format("%Y-%m-%d %H:%M:%S UTC")
                ),
                ui::StyleType::Subtle
            )
        )
    }
}

pub async fn run(store: &HoldingsStore, resolver: &PriceResolver, currency: &str) -> Result<()> {
    let holdings = store.load()?;
    if holdings.is_empty() {
        println!("No holdings recorded yet.");
        return Ok(());
    }

    let pb = ui::new_spinner("Resolving prices...");
    let prices = resolver.resolve_holdings(&holdings, currency).await;
    pb.finish_and_clear();

    println!("{}", prices.display_as_table(currency));
    Ok(())
}
