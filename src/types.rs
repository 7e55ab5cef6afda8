//! Types for the coin price service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Latest known price record for one coin
///
/// Decimal values are kept as text so upstream values pass through without a
/// floating-point round trip. The default value (all fields empty) stands for
/// a coin that has not been fetched yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinPriceSnapshot {
    pub name: String,
    pub price_usd: String,
    pub price_btc: String,
    pub price_cny: String,
}

impl CoinPriceSnapshot {
    /// Create a snapshot from its four fields
    pub fn new(
        name: impl Into<String>,
        price_usd: impl Into<String>,
        price_btc: impl Into<String>,
        price_cny: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price_usd: price_usd.into(),
            price_btc: price_btc.into(),
            price_cny: price_cny.into(),
        }
    }

    /// True until the coin has been written by a refresh
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&CoinMarketInfo> for CoinPriceSnapshot {
    fn from(info: &CoinMarketInfo) -> Self {
        Self {
            name: info.name.clone(),
            price_usd: info.price_usd.clone(),
            price_btc: info.price_btc.clone(),
            price_cny: info.price_cny.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One ticker entry as returned by the CoinMarketCap v1 API
///
/// Every field is textual upstream; absent and `null` fields become empty
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinMarketInfo {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rank: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_usd: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_btc: String,
    #[serde(rename = "24h_volume_usd", default, deserialize_with = "null_as_empty")]
    pub volume_usd_24h: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub market_cap_usd: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub available_supply: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub total_supply: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub max_supply: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub percent_change_1h: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub percent_change_24h: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub percent_change_7d: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_updated: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub price_cny: String,
    #[serde(rename = "24h_volume_cny", default, deserialize_with = "null_as_empty")]
    pub volume_cny_24h: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub market_cap_cny: String,
}

fn ok_flag<S>(ok: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*ok))
}

/// Answer to a price query
///
/// Serialized as `{"ok": 0|1, "data": {<id>: <snapshot>, ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    #[serde(serialize_with = "ok_flag")]
    pub ok: bool,
    pub data: BTreeMap<String, CoinPriceSnapshot>,
}

impl QueryResult {
    /// Result for an identifier outside the allow-list
    pub fn rejected() -> Self {
        Self::default()
    }

    /// Successful result carrying the given snapshots
    pub fn with_data(data: impl IntoIterator<Item = (String, CoinPriceSnapshot)>) -> Self {
        Self {
            ok: true,
            data: data.into_iter().collect(),
        }
    }
}

/// Cache events published by the refresh loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceEvent {
    /// A coin's snapshot was replaced
    PriceUpdated {
        id: Uuid,
        coin: String,
        price_usd: String,
        timestamp: DateTime<Utc>,
    },

    /// Upstream fetch failed; the previous snapshot stays in place
    PriceFetchFailed {
        id: Uuid,
        coin: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PriceEvent {
    pub fn updated(coin: &str, snapshot: &CoinPriceSnapshot) -> Self {
        PriceEvent::PriceUpdated {
            id: Uuid::new_v4(),
            coin: coin.to_string(),
            price_usd: snapshot.price_usd.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn fetch_failed(coin: &str, error_message: impl Into<String>) -> Self {
        PriceEvent::PriceFetchFailed {
            id: Uuid::new_v4(),
            coin: coin.to_string(),
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            PriceEvent::PriceUpdated { id, .. } => *id,
            PriceEvent::PriceFetchFailed { id, .. } => *id,
        }
    }

    /// Coin the event is about
    pub fn coin(&self) -> &str {
        match self {
            PriceEvent::PriceUpdated { coin, .. } => coin,
            PriceEvent::PriceFetchFailed { coin, .. } => coin,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            PriceEvent::PriceUpdated { .. } => "PRICE_UPDATED",
            PriceEvent::PriceFetchFailed { .. } => "PRICE_FETCH_FAILED",
        }
    }
}

impl std::fmt::Display for PriceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceEvent::PriceUpdated {
                coin, price_usd, ..
            } => write!(f, "Price updated: {} = ${}", coin, price_usd),
            PriceEvent::PriceFetchFailed {
                coin,
                error_message,
                ..
            } => write!(f, "Price fetch failed for {}: {}", coin, error_message),
        }
    }
}

/// Overall service health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every polled coin has been fetched at least once
    Healthy,
    /// Some polled coins still have no data
    Degraded,
    /// No polled coin has data yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
