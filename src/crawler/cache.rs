//! Connection cache for reverse-follow checks
//!
//! Fetching an artist's following list is the most expensive call the crawl makes,
//! and the same target is often checked against several sources in a row. The
//! cache keeps one following-id snapshot per target until it either confirms a
//! follow-back (the snapshot is then consumed) or goes a whole eviction cycle
//! without being consulted.

use crate::graph::ArtistId;
use std::collections::{HashMap, HashSet};
use std::future::Future;

/// Cached following snapshot for one target
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Non-confirming lookups since the last eviction cycle
    pub access_count: u32,

    /// Ids the target followed when it was fetched
    pub following: HashSet<ArtistId>,
}

/// Answer of [`ConnectionCache::lookup_or_fetch`]
#[derive(Debug)]
pub struct Lookup<'a> {
    pub following: &'a HashSet<ArtistId>,

    /// True when the set was fetched by this lookup rather than served from the cache
    pub fetched: bool,
}

/// Memoizes following-id sets by target artist
#[derive(Debug, Default)]
pub struct ConnectionCache {
    entries: HashMap<ArtistId, CacheEntry>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached following set of `target`, fetching it on a miss
    ///
    /// The answer records whether a fetch happened. A fetched set is stored with an access count of 0. A failed fetch is
    /// returned as-is and nothing is cached.
    pub async fn lookup_or_fetch<F, Fut, E>(
        &mut self,
        target: ArtistId,
        fetch: F,
    ) -> Result<Lookup<'_>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashSet<ArtistId>, E>>,
    {
        let fetched = !self.entries.contains_key(&target);
        if fetched {
            let following = fetch().await?;
            tracing::trace!(
                "Cached {} followings of artist {}",
                following.len(),
                target
            );
            self.entries.insert(
                target,
                CacheEntry {
                    access_count: 0,
                    following,
                },
            );
        } else {
            tracing::trace!("Cache hit for artist {}", target);
        }

        Ok(Lookup {
            following: &self.entries[&target].following,
            fetched,
        })
    }

    /// Checks whether `target` follows `source` using the cached snapshot
    ///
    /// A positive answer consumes the entry. A negative answer bumps its access
    /// count. Without an entry the answer is false.
    pub fn confirm_and_consume(&mut self, target: ArtistId, source: ArtistId) -> bool {
        let Some(entry) = self.entries.get_mut(&target) else {
            return false;
        };

        if entry.following.contains(&source) {
            self.entries.remove(&target);
            true
        } else {
            entry.access_count += 1;
            false
        }
    }

    /// Drops every entry not consulted since the last cycle
    ///
    /// Surviving entries start the next cycle with an access count of 0.
    /// Returns the number of evicted entries.
    pub fn evict_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.access_count > 0);
        for entry in self.entries.values_mut() {
            entry.access_count = 0;
        }
        let evicted = before - self.entries.len();
        tracing::debug!(
            "Evicted {} unused cache entries, {} remain",
            evicted,
            self.entries.len()
        );
        evicted
    }

    pub fn get(&self, target: ArtistId) -> Option<&CacheEntry> {
        self.entries.get(&target)
    }

    pub fn contains(&self, target: ArtistId) -> bool {
        self.entries.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    const S: ArtistId = ArtistId(1);
    const T: ArtistId = ArtistId(2);
    const U: ArtistId = ArtistId(3);
    const X: ArtistId = ArtistId(4);

    fn set(ids: &[ArtistId]) -> HashSet<ArtistId> {
        ids.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores_with_zero_access() {
        let mut cache = ConnectionCache::new();
        let lookup = cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[S, X])) })
            .await
            .unwrap();
        assert_eq!(lookup.following.len(), 2);
        assert!(lookup.fetched);
        assert_eq!(cache.get(T).unwrap().access_count, 0);
    }

    #[tokio::test]
    async fn test_hit_does_not_fetch_again() {
        let mut cache = ConnectionCache::new();
        cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[S])) })
            .await
            .unwrap();

        let mut called = false;
        let lookup = cache
            .lookup_or_fetch(T, || {
                called = true;
                async { Ok::<_, Infallible>(HashSet::new()) }
            })
            .await
            .unwrap();
        assert!(lookup.following.contains(&S));
        assert!(!lookup.fetched);
        assert!(!called);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let mut cache = ConnectionCache::new();
        let result = cache
            .lookup_or_fetch(T, || async { Err::<HashSet<ArtistId>, _>("boom") })
            .await;
        assert!(result.is_err());
        assert!(!cache.contains(T));
    }

    #[tokio::test]
    async fn test_confirmation_consumes_entry() {
        let mut cache = ConnectionCache::new();
        cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[S, X])) })
            .await
            .unwrap();

        assert!(cache.confirm_and_consume(T, S));
        assert!(!cache.contains(T));
    }

    #[tokio::test]
    async fn test_non_confirmation_increments_access() {
        let mut cache = ConnectionCache::new();
        cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[X])) })
            .await
            .unwrap();

        assert!(!cache.confirm_and_consume(T, S));
        assert!(!cache.confirm_and_consume(T, U));
        assert_eq!(cache.get(T).unwrap().access_count, 2);
    }

    #[test]
    fn test_confirm_without_entry_is_false() {
        let mut cache = ConnectionCache::new();
        assert!(!cache.confirm_and_consume(T, S));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_evict_unused_keeps_consulted_entries() {
        let mut cache = ConnectionCache::new();
        cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[X])) })
            .await
            .unwrap();
        cache
            .lookup_or_fetch(U, || async { Ok::<_, Infallible>(set(&[X])) })
            .await
            .unwrap();
        assert!(!cache.confirm_and_consume(T, S));

        assert_eq!(cache.evict_unused(), 1);
        assert!(cache.contains(T));
        assert!(!cache.contains(U));
    }

    #[tokio::test]
    async fn test_survivors_must_be_used_again_next_cycle() {
        let mut cache = ConnectionCache::new();
        cache
            .lookup_or_fetch(T, || async { Ok::<_, Infallible>(set(&[X])) })
            .await
            .unwrap();
        cache.confirm_and_consume(T, S);

        cache.evict_unused();
        assert_eq!(cache.get(T).unwrap().access_count, 0);
        cache.evict_unused();
        assert!(!cache.contains(T));
    }
}
