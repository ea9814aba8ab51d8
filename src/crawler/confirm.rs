//! Mutual-confirmation engine
//!
//! This module handles:
//! - Checking whether a target artist follows a source back, through the cache
//! - Favorites enrichment of encounter counts after a positive check

use crate::crawler::cache::ConnectionCache;
use crate::crawler::encounters::EncounterCounts;
use crate::crawler::retry::RetryPolicy;
use crate::directory::DirectoryClient;
use crate::graph::ArtistId;
use crate::Result;
use std::collections::HashMap;

/// Verifies follow-backs and boosts encounter counts from favorites
#[derive(Debug, Clone, Copy)]
pub struct MutualConfirmation {
    retry: RetryPolicy,
    boost_cap: u32,
}

impl MutualConfirmation {
    pub fn new(retry: RetryPolicy, boost_cap: u32) -> Self {
        Self { retry, boost_cap }
    }

    /// Reports whether `target` follows `source`
    ///
    /// The target's following ids come from the cache, fetched with bounded
    /// retry on a miss. A positive answer consumes the cache entry. When the
    /// answer came from a fresh fetch it also runs one favorites enrichment
    /// pass over `target`; a confirmation served from the cache does not.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the follow-back was confirmed
    /// * `Err(EchoError::PermanentFailure)` - The following fetch ran out of retries
    /// * `Err(EchoError)` - Any other fetch failure
    pub async fn follow_back<D: DirectoryClient>(
        &self,
        directory: &D,
        cache: &mut ConnectionCache,
        encounters: &mut EncounterCounts,
        source: ArtistId,
        target: ArtistId,
    ) -> Result<bool> {
        let retry = self.retry;
        let operation = format!("fetch following ids of {}", target);
        let fetched = cache
            .lookup_or_fetch(target, || {
                retry.run(&operation, move || directory.fetch_following_ids(target))
            })
            .await?
            .fetched;

        let confirmed = cache.confirm_and_consume(target, source);
        tracing::debug!(
            "Follow-back {} -> {}: {}",
            target,
            source,
            if confirmed { "confirmed" } else { "absent" }
        );

        if confirmed && fetched {
            self.enrich(directory, encounters, target, self.boost_cap)
                .await;
        }

        Ok(confirmed)
    }

    /// Boosts encounter counts of artists whose tracks `target` favorited
    ///
    /// Each favorited artist gains at most `cap` encounters per pass and
    /// self-favorites are ignored. A failed favorites fetch is logged and
    /// counts as zero boosts.
    ///
    /// # Returns
    ///
    /// The number of boosts applied
    pub async fn enrich<D: DirectoryClient>(
        &self,
        directory: &D,
        encounters: &mut EncounterCounts,
        target: ArtistId,
        cap: u32,
    ) -> usize {
        let operation = format!("fetch favorites of {}", target);
        let favorites = match self
            .retry
            .run(&operation, || directory.fetch_favorites(target))
            .await
        {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::warn!("Enrichment of artist {} skipped: {}", target, e);
                return 0;
            }
        };

        let mut boosts: HashMap<ArtistId, u32> = HashMap::new();
        let mut applied = 0;
        for favorite in favorites {
            if favorite.user_id == target {
                continue;
            }
            let given = boosts.entry(favorite.user_id).or_insert(0);
            if *given >= cap {
                continue;
            }
            *given += 1;
            encounters.increment(favorite.user_id);
            applied += 1;
        }

        if applied > 0 {
            tracing::debug!(
                "Enrichment of artist {} boosted {} artists ({} boosts)",
                target,
                boosts.len(),
                applied
            );
        }
        applied
    }
}
