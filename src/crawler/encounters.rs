//! Encounter counts, the crawl's popularity proxy

use crate::graph::ArtistId;
use std::collections::HashMap;

/// Per-artist encounter counter; counts only ever grow
#[derive(Debug, Clone, Default)]
pub struct EncounterCounts {
    counts: HashMap<ArtistId, u64>,
}

impl EncounterCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one encounter and returns the new count
    pub fn increment(&mut self, id: ArtistId) -> u64 {
        let count = self.counts.entry(id).or_insert(0);
        *count += 1;
        *count
    }

    /// Raises the count to at least `value`
    pub fn raise_to(&mut self, id: ArtistId, value: u64) {
        let count = self.counts.entry(id).or_insert(0);
        *count = (*count).max(value);
    }

    pub fn get(&self, id: ArtistId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtistId, u64)> + '_ {
        self.counts.iter().map(|(id, count)| (*id, *count))
    }

    pub fn as_map(&self) -> &HashMap<ArtistId, u64> {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
