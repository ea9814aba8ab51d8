//! Frontier scheduler for pending crawl candidates
//!
//! This module handles:
//! - Priority ordering of artists waiting to be expanded (larger is sooner)
//! - Re-keying an artist by tombstoning its live entry and inserting a new one
//! - Deterministic tie-breaking by insertion order

use crate::graph::ArtistId;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// A live frontier entry handed out by the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontierEntry {
    pub id: ArtistId,
    pub priority: f64,
}

/// Stored entry; tombstoned entries stay in the heap until popped
#[derive(Debug)]
struct Slot {
    id: ArtistId,
    priority: f64,
    tombstoned: bool,
}

/// Heap key: highest priority first, then earliest insertion
#[derive(Debug, Clone, Copy)]
struct HeapKey {
    priority: f64,
    seq: u64,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapKey {}

/// Priority-ordered set of pending artists, at most one live entry per id
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<HeapKey>,
    slots: HashMap<u64, Slot>,
    live: HashMap<ArtistId, u64>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `id` at `priority`, replacing any live entry for it
    pub fn schedule(&mut self, id: ArtistId, priority: f64) {
        if let Some(old_seq) = self.live.remove(&id) {
            if let Some(slot) = self.slots.get_mut(&old_seq) {
                slot.tombstoned = true;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(
            seq,
            Slot {
                id,
                priority,
                tombstoned: false,
            },
        );
        self.live.insert(id, seq);
        self.heap.push(HeapKey { priority, seq });
    }

    /// Removes and returns the live entry with the greatest priority
    ///
    /// Returns `None` once no live entries remain.
    pub fn pop_highest(&mut self) -> Option<FrontierEntry> {
        while let Some(key) = self.heap.pop() {
            let Some(slot) = self.slots.remove(&key.seq) else {
                continue;
            };
            if slot.tombstoned {
                continue;
            }
            self.live.remove(&slot.id);
            return Some(FrontierEntry {
                id: slot.id,
                priority: slot.priority,
            });
        }
        None
    }

    /// Lists up to `n` live entries in pop order without removing them
    pub fn peek_top(&self, n: usize) -> Vec<FrontierEntry> {
        let mut keys: Vec<HeapKey> = self
            .live
            .values()
            .filter_map(|seq| {
                self.slots.get(seq).map(|slot| HeapKey {
                    priority: slot.priority,
                    seq: *seq,
                })
            })
            .collect();
        keys.sort_by(|a, b| b.cmp(a));

        keys.into_iter()
            .take(n)
            .filter_map(|key| {
                self.slots.get(&key.seq).map(|slot| FrontierEntry {
                    id: slot.id,
                    priority: slot.priority,
                })
            })
            .collect()
    }

    /// Returns the number of live entries
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, id: ArtistId) -> bool {
        self.live.contains_key(&id)
    }

    /// Returns the priority of the live entry for `id`
    pub fn priority_of(&self, id: ArtistId) -> Option<f64> {
        self.live
            .get(&id)
            .and_then(|seq| self.slots.get(seq))
            .map(|slot| slot.priority)
    }
}
