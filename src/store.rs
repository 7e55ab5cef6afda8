//! In-memory price cache shared by the refresh loop and the query path

use crate::types::CoinPriceSnapshot;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Type alias for the price map (coin identifier -> latest snapshot)
type PriceMap = HashMap<String, CoinPriceSnapshot>;

/// In-memory store for coin prices
///
/// A single lock guards the whole map. Snapshots are copied in and out, so
/// the lock is never held across I/O or an `.await`, and an entry is always
/// replaced as a whole.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: RwLock<PriceMap>,
}

impl PriceCache {
    /// Creates a cache holding an empty snapshot for every given coin
    pub fn new<I, S>(coins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prices = coins
            .into_iter()
            .map(|coin| (coin.into(), CoinPriceSnapshot::default()))
            .collect();

        Self {
            prices: RwLock::new(prices),
        }
    }

    // Writers only ever swap whole snapshots in, so a panic elsewhere cannot
    // leave a half-written entry behind and the poison flag can be ignored.
    fn read(&self) -> RwLockReadGuard<'_, PriceMap> {
        self.prices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PriceMap> {
        self.prices.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets the current snapshot for a coin
    ///
    /// Registered coins always yield a snapshot, empty until first fetched.
    pub fn get(&self, coin: &str) -> Option<CoinPriceSnapshot> {
        self.read().get(coin).cloned()
    }

    /// Gets a copy of every cached snapshot
    pub fn get_all(&self) -> HashMap<String, CoinPriceSnapshot> {
        self.read().clone()
    }

    /// Replaces the snapshot for a coin
    pub fn set(&self, coin: impl Into<String>, snapshot: CoinPriceSnapshot) {
        let coin = coin.into();
        tracing::debug!(coin = %coin, price_usd = %snapshot.price_usd, "Updated price");
        self.write().insert(coin, snapshot);
    }

    /// Replaces several snapshots under one lock acquisition
    ///
    /// Readers observe either none or all of the given entries.
    pub fn set_many<I>(&self, snapshots: I)
    where
        I: IntoIterator<Item = (String, CoinPriceSnapshot)>,
    {
        let snapshots: Vec<_> = snapshots.into_iter().collect();
        let count = snapshots.len();
        self.write().extend(snapshots);
        tracing::debug!(count, "Updated prices");
    }

    /// Lists the registered coin identifiers
    pub fn coins(&self) -> Vec<String> {
        let mut coins: Vec<String> = self.read().keys().cloned().collect();
        coins.sort();
        coins
    }

    /// Number of registered coins
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when no coin is registered
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
