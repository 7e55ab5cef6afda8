//! Upstream price source implementations

pub mod coinmarketcap;

pub use coinmarketcap::CoinMarketCapSource;
