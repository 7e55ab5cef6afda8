//! Background refresh of the price cache
//!
//! [`PriceTracker::refresh_once`] runs a single refresh cycle and can be
//! called directly; [`PriceTracker::run`] drives it forever until the stop
//! signal fires.

use crate::{
    constants::{
        DEFAULT_BASE_COIN, DEFAULT_COINS, DEFAULT_DERIVED_COINS, DEFAULT_MULTIPLIER,
        EVENT_CHANNEL_CAPACITY, REFRESH_INTERVAL_MS, REQUEST_TIMEOUT_SECS,
    },
    derive::derive_price,
    error::ProviderError,
    metrics::{MetricsCollector, ProviderMetrics},
    provider::PriceSource,
    store::PriceCache,
    types::{CoinPriceSnapshot, ComponentHealth, HealthStatus, PriceEvent},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// What the refresh loop polls and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Coins fetched from the upstream source, in polling order
    pub coins: Vec<String>,
    /// Coins computed from the base coin instead of fetched
    pub derived: Vec<String>,
    /// Coin whose snapshot drives the derived coins
    pub base_coin: String,
    /// Ratio applied to the base coin's prices
    pub multiplier: String,
    /// Pause between two refresh cycles; zero polls back to back
    pub interval: Duration,
    /// Upper bound on a single upstream call
    pub request_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            coins: DEFAULT_COINS.iter().map(|c| c.to_string()).collect(),
            derived: DEFAULT_DERIVED_COINS.iter().map(|c| c.to_string()).collect(),
            base_coin: DEFAULT_BASE_COIN.to_string(),
            multiplier: DEFAULT_MULTIPLIER.to_string(),
            interval: Duration::from_millis(REFRESH_INTERVAL_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl RefreshSettings {
    /// True if the coin is priced from the base coin
    pub fn is_derived(&self, coin: &str) -> bool {
        self.derived.iter().any(|d| d == coin)
    }

    /// Every identifier the cache must hold, polled coins first
    pub fn all_coins(&self) -> Vec<String> {
        self.coins.iter().chain(&self.derived).cloned().collect()
    }
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Coins fetched and written
    pub updated: Vec<String>,
    /// Coins whose fetch failed; their previous snapshot was kept
    pub failed: Vec<String>,
    /// Derived coins recomputed from a fresh base snapshot
    pub derived: Vec<String>,
}

/// Keeps the price cache fresh
///
/// Fetches are best effort: a failed or timed-out fetch is logged and the coin
/// is skipped until the next cycle. There is no retry, backoff or circuit
/// breaker, and the previous snapshot stays visible to readers meanwhile.
pub struct PriceTracker {
    cache: Arc<PriceCache>,
    source: Arc<dyn PriceSource>,
    settings: RefreshSettings,
    metrics: MetricsCollector,
    events: broadcast::Sender<PriceEvent>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl PriceTracker {
    /// Creates a tracker writing into `cache` with data from `source`
    pub fn new(
        cache: Arc<PriceCache>,
        source: Arc<dyn PriceSource>,
        settings: RefreshSettings,
    ) -> Self {
        let metrics = MetricsCollector::new(source.provider_name());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            cache,
            source,
            settings,
            metrics,
            events,
            last_refresh: RwLock::new(None),
        }
    }

    /// The cache this tracker writes into
    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Subscribes to cache update and fetch failure events
    pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.events.subscribe()
    }

    /// Fetches one coin, bounded by the per-call timeout
    async fn fetch(&self, coin: &str) -> Result<CoinPriceSnapshot, ProviderError> {
        let start = Instant::now();
        let result = match timeout(self.settings.request_timeout, self.source.fetch(coin)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };
        self.metrics
            .record_request(start.elapsed(), result.is_ok())
            .await;

        result.map(|info| CoinPriceSnapshot::from(&info))
    }

    /// Runs one refresh cycle over the configured coins
    ///
    /// Coins are fetched one at a time. When the base coin is refreshed, every
    /// derived coin is recomputed from it and written in the same cache update.
    pub async fn refresh_once(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        for coin in &self.settings.coins {
            if self.settings.is_derived(coin) {
                continue;
            }

            let snapshot = match self.fetch(coin).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        coin = %coin,
                        provider = self.source.provider_name(),
                        error = %e,
                        "Failed to fetch price, keeping previous value"
                    );
                    let _ = self.events.send(PriceEvent::fetch_failed(coin, e.to_string()));
                    report.failed.push(coin.clone());
                    continue;
                }
            };

            let mut writes = vec![(coin.clone(), snapshot)];
            if *coin == self.settings.base_coin {
                for derived in &self.settings.derived {
                    let derived_snapshot =
                        derive_price(derived, &writes[0].1, &self.settings.multiplier);
                    writes.push((derived.clone(), derived_snapshot));
                    report.derived.push(derived.clone());
                }
            }

            let events: Vec<PriceEvent> = writes
                .iter()
                .map(|(coin, snapshot)| PriceEvent::updated(coin, snapshot))
                .collect();
            self.cache.set_many(writes);
            for event in events {
                let _ = self.events.send(event);
            }

            report.updated.push(coin.clone());
        }

        *self.last_refresh.write().await = Some(Utc::now());
        report
    }

    /// Refreshes the cache until `stop` turns true or its sender is dropped
    ///
    /// The stop signal is honoured both mid-cycle and during the pause between
    /// cycles. A cycle interrupted mid-way leaves every coin either updated or
    /// untouched.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            provider = self.source.provider_name(),
            coins = ?self.settings.coins,
            derived = ?self.settings.derived,
            refresh_interval_ms = self.settings.interval.as_millis() as u64,
            "Starting price refresh loop"
        );

        loop {
            tokio::select! {
                report = self.refresh_once() => {
                    tracing::debug!(
                        updated = report.updated.len(),
                        failed = report.failed.len(),
                        derived = report.derived.len(),
                        "Refresh cycle finished"
                    );
                }
                _ = stopped(&mut stop) => break,
            }

            if self.settings.interval.is_zero() {
                tokio::task::yield_now().await;
                if *stop.borrow() {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = sleep(self.settings.interval) => {}
                _ = stopped(&mut stop) => break,
            }
        }

        tracing::info!("Price refresh loop stopped");
    }

    /// Starts [`run`](Self::run) on the tokio runtime
    pub fn spawn(self: &Arc<Self>, stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move { tracker.run(stop).await })
    }

    /// Gets upstream fetch metrics including latency percentiles and success rate
    pub async fn provider_metrics(&self) -> ProviderMetrics {
        self.metrics.get_metrics().await
    }

    /// Time the last refresh cycle completed
    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read().await
    }

    /// Perform a health check on the tracker
    ///
    /// # Returns
    /// ComponentHealth reflecting how many polled coins have data
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = std::collections::HashMap::new();

        let polled: Vec<&String> = self
            .settings
            .coins
            .iter()
            .filter(|coin| !self.settings.is_derived(coin))
            .collect();
        let unfetched: Vec<String> = polled
            .iter()
            .filter(|coin| self.cache.get(coin).map_or(true, |s| s.is_empty()))
            .map(|coin| coin.to_string())
            .collect();
        let fetched = polled.len() - unfetched.len();

        details.insert("tracked_coins".to_string(), serde_json::json!(self.cache.len()));
        details.insert("fetched_coins".to_string(), serde_json::json!(fetched));
        details.insert("unfetched_coins".to_string(), serde_json::json!(unfetched));
        let last_refresh = self.last_refresh().await;
        details.insert("last_refresh".to_string(), serde_json::json!(last_refresh));
        let metrics = self.provider_metrics().await;
        details.insert("provider".to_string(), serde_json::json!(metrics));

        let status = if fetched == 0 {
            HealthStatus::Unhealthy
        } else if !unfetched.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Every polled coin has a price".to_string(),
            HealthStatus::Degraded => {
                format!("{} polled coins have no price yet", unfetched.len())
            }
            HealthStatus::Unhealthy => "No polled coin has a price yet".to_string(),
        };

        ComponentHealth {
            name: "price_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}

/// Resolves once the stop flag is set or its sender is gone
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockPriceSource;

    fn settings() -> RefreshSettings {
        RefreshSettings {
            interval: Duration::from_millis(10),
            request_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    fn tracker_with(source: Arc<MockPriceSource>, settings: RefreshSettings) -> PriceTracker {
        let cache = Arc::new(PriceCache::new(settings.all_coins()));
        PriceTracker::new(cache, source, settings)
    }

    #[tokio::test]
    async fn test_cache_is_empty_before_first_fetch() {
        let tracker = tracker_with(Arc::new(MockPriceSource::new()), settings());

        for coin in ["bitcoin", "skycoin", "samos", "yongbang"] {
            assert!(tracker.cache().get(coin).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_refresh_updates_base_and_derived_coins() {
        let source = Arc::new(MockPriceSource::new());
        source.set_price("bitcoin", "8000", "51000");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = tracker_with(source.clone(), settings());

        let report = tracker.refresh_once().await;

        assert_eq!(report.updated, vec!["bitcoin", "skycoin"]);
        assert!(report.failed.is_empty());
        assert_eq!(report.derived, vec!["samos", "yongbang"]);

        let cache = tracker.cache();
        assert_eq!(cache.get("bitcoin").unwrap().price_usd, "8000");
        assert_eq!(cache.get("skycoin").unwrap().price_cny, "156.9");
        for coin in ["samos", "yongbang"] {
            let derived = cache.get(coin).unwrap();
            assert_eq!(derived.name, coin);
            assert_eq!(derived.price_usd, "0.2520");
            assert_eq!(derived.price_cny, "1.6065");
            assert_eq!(derived.price_btc, "0.0000315");
        }

        // Derived coins are computed, never fetched
        assert_eq!(source.calls(), vec!["bitcoin", "skycoin"]);
    }

    #[tokio::test]
    async fn test_non_numeric_base_price_gives_unknown_derived_prices() {
        let source = Arc::new(MockPriceSource::new());
        source.set_price("bitcoin", "?", "51000");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = tracker_with(source, settings());

        tracker.refresh_once().await;

        let samos = tracker.cache().get("samos").unwrap();
        assert_eq!(samos.price_usd, "unknown");
        assert_eq!(samos.price_cny, "unknown");
        assert_eq!(samos.price_btc, "0.0000315");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_value_without_retry() {
        let source = Arc::new(MockPriceSource::new());
        source.set_price("bitcoin", "8000", "51000");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = tracker_with(source.clone(), settings());
        tracker.refresh_once().await;

        let mut events = tracker.subscribe();
        source.set_error("skycoin", "HTTP 503");
        source.set_price("bitcoin", "9000", "57000");

        let report = tracker.refresh_once().await;

        assert_eq!(report.updated, vec!["bitcoin"]);
        assert_eq!(report.failed, vec!["skycoin"]);
        assert_eq!(tracker.cache().get("skycoin").unwrap().price_usd, "24.693");
        assert_eq!(tracker.cache().get("bitcoin").unwrap().price_usd, "9000");
        assert_eq!(source.call_count(), 4);

        let mut failures = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PriceEvent::PriceFetchFailed { coin, .. } = event {
                failures.push(coin);
            }
        }
        assert_eq!(failures, vec!["skycoin"]);

        let metrics = tracker.provider_metrics().await;
        assert_eq!(metrics.provider_name, "mock");
        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_hanging_fetch_times_out() {
        let source = Arc::new(MockPriceSource::new());
        source.set_hang("bitcoin");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = tracker_with(source, settings());

        let report = tracker.refresh_once().await;

        assert_eq!(report.failed, vec!["bitcoin"]);
        assert_eq!(report.updated, vec!["skycoin"]);
        assert!(tracker.cache().get("samos").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_base_coin_failure_leaves_derived_untouched() {
        let source = Arc::new(MockPriceSource::new());
        source.set_error("bitcoin", "HTTP 500");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = tracker_with(source, settings());

        let report = tracker.refresh_once().await;

        assert!(report.derived.is_empty());
        assert!(tracker.cache().get("yongbang").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_signal() {
        let source = Arc::new(MockPriceSource::new());
        source.set_price("bitcoin", "8000", "51000");
        source.set_price("skycoin", "24.693", "156.9");
        let tracker = Arc::new(tracker_with(source.clone(), settings()));

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tracker.spawn(stop_rx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while source.call_count() < 6 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("refresh loop should keep cycling");

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh loop should stop")
            .unwrap();

        assert!(tracker.last_refresh().await.is_some());
        assert_eq!(tracker.cache().get("samos").unwrap().price_usd, "0.2520");
    }

    #[tokio::test]
    async fn test_run_stops_when_signal_sender_dropped() {
        let source = Arc::new(MockPriceSource::new());
        source.set_hang("bitcoin");
        let tracker = Arc::new(tracker_with(
            source,
            RefreshSettings {
                request_timeout: Duration::from_secs(3600),
                ..settings()
            },
        ));

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tracker.spawn(stop_rx);
        sleep(Duration::from_millis(20)).await;
        drop(stop_tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh loop should stop mid-cycle")
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_reflects_fetched_coins() {
        let source = Arc::new(MockPriceSource::new());
        let tracker = tracker_with(source.clone(), settings());
        assert_eq!(tracker.health_check().await.status, HealthStatus::Unhealthy);

        source.set_price("bitcoin", "8000", "51000");
        source.set_error("skycoin", "HTTP 503");
        tracker.refresh_once().await;
        let health = tracker.health_check().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.details["unfetched_coins"], serde_json::json!(["skycoin"]));

        source.set_price("skycoin", "24.693", "156.9");
        tracker.refresh_once().await;
        assert_eq!(tracker.health_check().await.status, HealthStatus::Healthy);
    }
}
