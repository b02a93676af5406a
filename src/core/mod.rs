//! Price resolution and portfolio valuation

pub mod cache;
pub mod classify;
pub mod config;
pub mod holding;
pub mod log;
pub mod price;
pub mod reconcile;
pub mod request;
pub mod resolver;
pub mod valuation;

// Re-export main types for cleaner imports
pub use holding::{Holding, InstrumentType};
pub use price::{CryptoQuotable, EquityQuotable, FallbackTable, PriceMap, ResolvedPrice};
pub use resolver::PriceResolver;
pub use valuation::{Valuation, calculate_valuation};
