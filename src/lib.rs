//! # Coin Price Service
//!
//! Periodically fetches coin market data from CoinMarketCap, keeps the latest
//! snapshot of every tracked coin in memory, and answers price queries from
//! that cache.
//!
//! ## Architecture
//!
//! ```text
//! PriceTracker (background refresh loop)
//!     ↓
//! PriceSource (CoinMarketCap)  →  derive_price (derived coins)
//!     ↓
//! PriceCache (single lock, in-memory)
//!     ↑
//! QueryService  ←  HTTP endpoint
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use coin_price_service::{
//!     providers::CoinMarketCapSource, PriceCache, PriceTracker, QueryService, RefreshSettings,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = RefreshSettings::default();
//! let cache = Arc::new(PriceCache::new(settings.all_coins()));
//! let query = QueryService::new(cache.clone(), settings.all_coins());
//!
//! let tracker = Arc::new(PriceTracker::new(
//!     cache,
//!     Arc::new(CoinMarketCapSource::new()?),
//!     settings,
//! ));
//! let (stop, stop_rx) = tokio::sync::watch::channel(false);
//! let refresh = tracker.spawn(stop_rx);
//!
//! let result = query.handle("all");
//! for (coin, snapshot) in &result.data {
//!     println!("{}: ${}", coin, snapshot.price_usd);
//! }
//!
//! stop.send(true)?;
//! refresh.await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure policy
//!
//! Upstream fetches are best effort. A failed fetch is logged and skipped; the
//! previous snapshot stays visible until the next successful refresh. There is
//! no retry or backoff.

pub mod config;
pub mod constants;
pub mod derive;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod query;
pub mod server;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use derive::derive_price;
pub use error::{ConfigError, ProviderError};
pub use metrics::ProviderMetrics;
pub use provider::PriceSource;
pub use query::QueryService;
pub use store::PriceCache;
pub use tracker::{PriceTracker, RefreshReport, RefreshSettings};
pub use types::{
    CoinMarketInfo, CoinPriceSnapshot, ComponentHealth, HealthStatus, PriceEvent, QueryResult,
};
