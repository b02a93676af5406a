pub mod holdings;
pub mod prices;
pub mod resolve;
pub mod setup;
pub mod summary;
pub mod ui;
