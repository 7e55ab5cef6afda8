//! Upstream source abstraction for fetching coin market data

use crate::{error::ProviderError, types::CoinMarketInfo};
use async_trait::async_trait;

/// Trait for upstream price sources
///
/// Implementations fetch the market record of one coin per call. The refresh
/// loop is the only caller and applies its own timeout on top.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the current market info for a single coin
    ///
    /// # Arguments
    /// * `coin` - Upstream identifier of the coin (e.g. `bitcoin`)
    async fn fetch(&self, coin: &str) -> Result<CoinMarketInfo, ProviderError>;

    /// Returns the name of this source
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted response for one coin
    #[derive(Debug, Clone)]
    enum Scripted {
        Price(CoinMarketInfo),
        Error(String),
        Hang,
    }

    /// Mock source for testing
    #[derive(Default)]
    pub struct MockPriceSource {
        responses: Arc<Mutex<HashMap<String, Scripted>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockPriceSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_price(&self, coin: &str, price_usd: &str, price_cny: &str) {
            let info = CoinMarketInfo {
                id: coin.to_string(),
                name: coin.to_uppercase(),
                price_usd: price_usd.to_string(),
                price_btc: "1.0".to_string(),
                price_cny: price_cny.to_string(),
                ..Default::default()
            };
            self.set_info(coin, info);
        }

        pub fn set_info(&self, coin: &str, info: CoinMarketInfo) {
            self.responses
                .lock()
                .unwrap()
                .insert(coin.to_string(), Scripted::Price(info));
        }

        pub fn set_error(&self, coin: &str, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(coin.to_string(), Scripted::Error(message.to_string()));
        }

        /// Makes fetches for `coin` never complete
        pub fn set_hang(&self, coin: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(coin.to_string(), Scripted::Hang);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceSource for MockPriceSource {
        async fn fetch(&self, coin: &str) -> Result<CoinMarketInfo, ProviderError> {
            self.calls.lock().unwrap().push(coin.to_string());
            let scripted = self.responses.lock().unwrap().get(coin).cloned();
            match scripted {
                Some(Scripted::Price(info)) => Ok(info),
                Some(Scripted::Error(message)) => Err(ProviderError::api_error(message)),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderError::Timeout)
                }
                None => Err(ProviderError::EmptyResponse(coin.to_string())),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
