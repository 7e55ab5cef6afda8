//! Read path answering price queries from the cache

use crate::{constants::WILDCARD, store::PriceCache, types::QueryResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Answers price queries from the cache only
///
/// Queries never touch the network; the only wait is the cache lock.
pub struct QueryService {
    cache: Arc<PriceCache>,
    allowed: HashSet<String>,
}

impl QueryService {
    /// Creates a query service recognizing `coins` plus the wildcard
    pub fn new<I, S>(cache: Arc<PriceCache>, coins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed: HashSet<String> = coins.into_iter().map(Into::into).collect();
        allowed.insert(WILDCARD.to_string());

        Self { cache, allowed }
    }

    /// True if `requested` is a recognized identifier or the wildcard
    pub fn is_recognized(&self, requested: &str) -> bool {
        self.allowed.contains(requested)
    }

    /// Answers a query for one coin or for every coin
    ///
    /// Unrecognized identifiers are rejected in-band with `ok = false`. A
    /// tracked coin yields its snapshot alone; anything else allowed (the
    /// wildcard) yields every cached snapshot.
    pub fn handle(&self, requested: &str) -> QueryResult {
        if !self.is_recognized(requested) {
            tracing::debug!(coin = requested, "Unsupported coin requested");
            return QueryResult::rejected();
        }

        if let Some(snapshot) = self.cache.get(requested) {
            return QueryResult::with_data([(requested.to_string(), snapshot)]);
        }

        QueryResult::with_data(self.cache.get_all())
    }
}
