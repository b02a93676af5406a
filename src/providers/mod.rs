pub mod coingecko;
pub mod finnhub;
pub mod util;

pub use coingecko::CoinGeckoProvider;
pub use finnhub::FinnhubProvider;
