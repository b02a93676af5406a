//! Provides functions for valuing holdings against a resolved price map.
use crate::core::holding::{Holding, InstrumentType};
use crate::core::price::{FallbackTable, PriceMap, ResolvedPrice};
use std::collections::BTreeMap;
use tracing::debug;

/// The calculated value of a single holding.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionValue {
    pub id: String,
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub quantity: f64,
    pub price: f64,
    pub price_source: ResolvedPrice,
    pub value: f64,
    pub cost: f64,
    pub pnl: f64,
    pub weight: Option<f64>,
}

/// Portfolio totals for one set of holdings and one price map.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub current: f64,
    pub cost: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    /// Current value per instrument type, in `InstrumentType` order.
    pub allocation: Vec<(InstrumentType, f64)>,
    pub positions: Vec<PositionValue>,
}

impl Valuation {
    /// Share of `current` held in `instrument_type`, as a percentage.
    pub fn allocation_pct(&self, instrument_type: InstrumentType) -> Option<f64> {
        if self.current <= 0.0 {
            return None;
        }
        self.allocation
            .iter()
            .find(|(t, _)| *t == instrument_type)
            .map(|(_, value)| value / self.current * 100.0)
    }
}

/// Values every holding and aggregates the totals.
///
/// The effective price of a holding is its resolved price, else the
/// fallback table's, else zero. P&L percentage is zero when the total cost
/// is zero.
pub fn calculate_valuation(
    holdings: &[Holding],
    prices: &PriceMap,
    fallback: &FallbackTable,
) -> Valuation {
    let mut current = 0.0;
    let mut cost = 0.0;
    let mut by_type: BTreeMap<InstrumentType, f64> = BTreeMap::new();
    let mut positions = Vec::with_capacity(holdings.len());

    for holding in holdings {
        let price_source = match prices.get(&holding.symbol) {
            Some(resolved @ (ResolvedPrice::Live(_) | ResolvedPrice::Fallback(_))) => resolved,
            _ => fallback
                .get(&holding.symbol)
                .map_or(ResolvedPrice::Unknown, ResolvedPrice::Fallback),
        };
        let price = price_source.value().unwrap_or(0.0);
        if price_source == ResolvedPrice::Unknown {
            debug!("No price available for {}, valuing at zero", holding.symbol);
        }

        let value = price * holding.quantity;
        let position_cost = holding.cost_basis_per_unit * holding.quantity;
        current += value;
        cost += position_cost;
        if value > 0.0 {
            *by_type.entry(holding.instrument_type).or_default() += value;
        }

        positions.push(PositionValue {
            id: holding.id.clone(),
            symbol: holding.symbol.clone(),
            instrument_type: holding.instrument_type,
            quantity: holding.quantity,
            price,
            price_source,
            value,
            cost: position_cost,
            pnl: value - position_cost,
            weight: None,
        });
    }

    if current > 0.0 {
        for position in &mut positions {
            position.weight = Some(position.value / current * 100.0);
        }
    }

    let pnl = current - cost;
    let pnl_pct = if cost > 0.0 { pnl / cost * 100.0 } else { 0.0 };

    Valuation {
        current,
        cost,
        pnl,
        pnl_pct,
        allocation: by_type.into_iter().collect(),
        positions,
    }
}
