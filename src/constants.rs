//! Default settings for the coin price service
//!
//! Every value here can be overridden at startup through the command line or
//! the matching `PRICE_SERVICE_*` environment variable (see `config`).

/// Default listen address of the HTTP surface
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8181";

/// Default ratio between a derived coin and the base coin
pub const DEFAULT_MULTIPLIER: &str = "0.0000315";

/// Coins fetched from the upstream API by default
pub const DEFAULT_COINS: &[&str] = &["bitcoin", "skycoin"];

/// [`DEFAULT_COINS`] as a comma-separated flag value
pub const DEFAULT_COINS_LIST: &str = "bitcoin,skycoin";

/// Coins priced from the base coin by default
pub const DEFAULT_DERIVED_COINS: &[&str] = &["samos", "yongbang"];

/// [`DEFAULT_DERIVED_COINS`] as a comma-separated flag value
pub const DEFAULT_DERIVED_COINS_LIST: &str = "samos,yongbang";

/// Coin whose snapshot drives every derived coin
pub const DEFAULT_BASE_COIN: &str = "bitcoin";

/// Query identifier that selects every cached coin
pub const WILDCARD: &str = "all";

/// Route serving price queries
pub const DEFAULT_QUERY_PATH: &str = "/api/price";

/// Query-string parameter carrying the requested coin identifier
pub const DEFAULT_QUERY_PARAM: &str = "token";

/// Delay between two refresh cycles (in milliseconds)
pub const REFRESH_INTERVAL_MS: u64 = 5_000;

/// Upper bound on a single upstream call (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// CoinMarketCap ticker API base URL
pub const COINMARKETCAP_API_URL: &str = "https://api.coinmarketcap.com/v1/ticker";

/// Extra fiat currency requested from CoinMarketCap
pub const COINMARKETCAP_CONVERT: &str = "CNY";

/// Placeholder for derived prices that could not be computed
pub const UNKNOWN_PRICE: &str = "unknown";

/// Buffered price events per subscriber before lagging ones drop messages
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-price-service/0.1.0";
