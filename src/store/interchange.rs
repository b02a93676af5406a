//! CSV import and export of holdings.

use anyhow::{Context, Result, anyhow, bail};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};

use crate::core::holding::{Holding, InstrumentType};

const EXPORT_HEADER: [&str; 6] = [
    "symbol",
    "type",
    "quantity",
    "costBasisPerUnit",
    "currency",
    "exchange",
];

/// Positions of the known columns within one file's header row.
struct Columns {
    symbol: usize,
    instrument_type: usize,
    quantity: usize,
    cost_basis_per_unit: usize,
    currency: Option<usize>,
    exchange: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let missing: Vec<&str> = EXPORT_HEADER[..4]
            .iter()
            .copied()
            .filter(|&name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            bail!("CSV header is missing required columns: {}", missing.join(", "));
        }

        Ok(Columns {
            symbol: find("symbol").unwrap_or_default(),
            instrument_type: find("type").unwrap_or_default(),
            quantity: find("quantity").unwrap_or_default(),
            cost_basis_per_unit: find("costBasisPerUnit").unwrap_or_default(),
            currency: find("currency"),
            exchange: find("exchange"),
        })
    }

    fn holding(&self, record: &StringRecord) -> Result<Holding> {
        let field = |index: usize| record.get(index).unwrap_or("").trim();
        let optional = |index: Option<usize>| index.map_or("", field);

        let instrument_type: InstrumentType = field(self.instrument_type).parse()?;
        let holding = Holding::new(
            field(self.symbol),
            instrument_type,
            parse_amount("quantity", field(self.quantity))?,
            parse_amount("costBasisPerUnit", field(self.cost_basis_per_unit))?,
        )?;

        Ok(holding
            .with_currency(optional(self.currency))
            .with_exchange(optional(self.exchange)))
    }
}

fn parse_amount(column: &str, value: &str) -> Result<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .map_err(|_| anyhow!("Invalid {column}: '{value}'"))
}

/// Renders holdings as CSV with a header row. Ids are not exported.
pub fn export_holdings(holdings: &[Holding]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;
    for holding in holdings {
        writer.write_record([
            holding.symbol.clone(),
            holding.instrument_type.to_string(),
            holding.quantity.to_string(),
            holding.cost_basis_per_unit.to_string(),
            holding.currency.clone(),
            holding.exchange.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to write CSV: {e}"))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Parses every row of `text` into a holding with a fresh id. Any invalid
/// header or row rejects the whole file.
pub fn import_holdings(text: &str) -> Result<Vec<Holding>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read CSV header")?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut holdings = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("Failed to read CSV line {line}"))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let holding = columns
            .holding(&record)
            .with_context(|| format!("Invalid holding on line {line}"))?;
        holdings.push(holding);
    }

    Ok(holdings)
}
