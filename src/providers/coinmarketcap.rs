//! CoinMarketCap ticker source implementation

use crate::{
    constants::{COINMARKETCAP_API_URL, COINMARKETCAP_CONVERT, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
    provider::PriceSource,
    types::CoinMarketInfo,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// CoinMarketCap v1 ticker source
///
/// `GET {base_url}/{coin}/?convert=CNY` answers with a JSON array whose first
/// element is the coin's market info.
pub struct CoinMarketCapSource {
    client: Client,
    base_url: String,
}

impl CoinMarketCapSource {
    /// Creates a source against the public API with the default timeout
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(
            COINMARKETCAP_API_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Creates a source against a custom endpoint (mirror or test server)
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Builds the ticker URL for one coin
    fn build_url(&self, coin: &str) -> String {
        format!(
            "{}/{}/?convert={}",
            self.base_url, coin, COINMARKETCAP_CONVERT
        )
    }
}

#[async_trait]
impl PriceSource for CoinMarketCapSource {
    async fn fetch(&self, coin: &str) -> Result<CoinMarketInfo, ProviderError> {
        let url = self.build_url(coin);
        tracing::debug!(url = %url, "Fetching ticker from CoinMarketCap");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::NetworkError(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::api_error(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        let tickers: Vec<CoinMarketInfo> = serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::invalid_response(format!(
                "Failed to parse CoinMarketCap response: {}. Response: {}",
                e, response_text
            ))
        })?;

        let info = tickers
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse(coin.to_string()))?;

        tracing::debug!(
            coin,
            price_btc = %info.price_btc,
            price_usd = %info.price_usd,
            "Fetched ticker from CoinMarketCap"
        );

        Ok(info)
    }

    fn provider_name(&self) -> &'static str {
        "coinmarketcap"
    }
}
