//! Startup configuration
//!
//! Every option is a command-line flag that can also be set through a
//! `PRICE_SERVICE_*` environment variable.

use crate::{
    constants::{
        COINMARKETCAP_API_URL, DEFAULT_BASE_COIN, DEFAULT_COINS_LIST, DEFAULT_DERIVED_COINS_LIST,
        DEFAULT_LISTEN_ADDR, DEFAULT_MULTIPLIER, DEFAULT_QUERY_PARAM, DEFAULT_QUERY_PATH,
        REFRESH_INTERVAL_MS, REQUEST_TIMEOUT_SECS, WILDCARD,
    },
    error::ConfigError,
    tracker::RefreshSettings,
};
use clap::Parser;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Parses a listen address, accepting the bare `:port` form for all interfaces
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let value = value.trim();
    let candidate = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };
    candidate
        .parse()
        .map_err(|_| ConfigError::InvalidListenAddr(value.to_string()))
}

/// Coin price quoting service
#[derive(Parser, Debug, Clone)]
#[command(name = "coin-price-service")]
#[command(about = "Caches coin prices from CoinMarketCap and serves them over HTTP")]
pub struct ServiceConfig {
    /// Listen address (`host:port` or `:port`)
    #[arg(long, env = "PRICE_SERVICE_ADDR", default_value = DEFAULT_LISTEN_ADDR, value_parser = parse_listen_addr)]
    pub addr: SocketAddr,

    /// Derived coin price relative to the base coin
    #[arg(long, env = "PRICE_SERVICE_MULTIPLY", default_value = DEFAULT_MULTIPLIER)]
    pub multiply: String,

    /// Coins fetched from the upstream API
    #[arg(long, env = "PRICE_SERVICE_COINS", value_delimiter = ',', default_value = DEFAULT_COINS_LIST)]
    pub coins: Vec<String>,

    /// Coins priced as a multiple of the base coin (empty to disable)
    #[arg(long, env = "PRICE_SERVICE_DERIVED", value_delimiter = ',', default_value = DEFAULT_DERIVED_COINS_LIST)]
    pub derived: Vec<String>,

    /// Coin whose price drives the derived coins
    #[arg(long, env = "PRICE_SERVICE_BASE_COIN", default_value = DEFAULT_BASE_COIN)]
    pub base_coin: String,

    /// Route serving price queries
    #[arg(long, env = "PRICE_SERVICE_PATH", default_value = DEFAULT_QUERY_PATH)]
    pub path: String,

    /// Query parameter carrying the requested coin
    #[arg(long, env = "PRICE_SERVICE_PARAM", default_value = DEFAULT_QUERY_PARAM)]
    pub param: String,

    /// Pause between refresh cycles in milliseconds (0 polls back to back)
    #[arg(long, env = "PRICE_SERVICE_REFRESH_INTERVAL_MS", default_value_t = REFRESH_INTERVAL_MS)]
    pub refresh_interval_ms: u64,

    /// Timeout of a single upstream request in seconds
    #[arg(long, env = "PRICE_SERVICE_REQUEST_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// CoinMarketCap ticker API base URL
    #[arg(long, env = "PRICE_SERVICE_API_URL", default_value = COINMARKETCAP_API_URL)]
    pub api_url: String,

    /// Emit logs as JSON
    #[arg(long, env = "PRICE_SERVICE_LOG_JSON")]
    pub log_json: bool,
}

impl ServiceConfig {
    /// Drops blank entries left over from delimiter parsing
    pub fn normalized(mut self) -> Self {
        let clean = |coins: Vec<String>| -> Vec<String> {
            coins
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        };
        self.coins = clean(self.coins);
        self.derived = clean(self.derived);
        self.base_coin = self.base_coin.trim().to_string();
        self
    }

    /// Checks the coin sets and route before anything starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coins.is_empty() {
            return Err(ConfigError::NoCoins);
        }

        let mut seen = HashSet::new();
        for coin in self.coins.iter().chain(&self.derived) {
            if coin == WILDCARD {
                return Err(ConfigError::ReservedIdentifier(coin.clone()));
            }
            if !seen.insert(coin.as_str()) {
                return Err(ConfigError::DuplicateCoin(coin.clone()));
            }
        }

        if !self.derived.is_empty() && !self.coins.contains(&self.base_coin) {
            return Err(ConfigError::MissingBaseCoin {
                base: self.base_coin.clone(),
            });
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.path.clone()));
        }

        if self.multiply.parse::<f64>().is_err() {
            tracing::warn!(
                multiply = %self.multiply,
                "Multiplier is not a number, derived coins will report unknown prices"
            );
        }

        Ok(())
    }

    /// Settings for the refresh loop
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            coins: self.coins.clone(),
            derived: self.derived.clone(),
            base_coin: self.base_coin.clone(),
            multiplier: self.multiply.clone(),
            interval: Duration::from_millis(self.refresh_interval_ms),
            request_timeout: self.request_timeout(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
