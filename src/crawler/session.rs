//! Crawl session state
//!
//! A [`CrawlSession`] owns everything one crawl mutates: the social graph, the
//! frontier, encounter counts, explored and recent-seed bookkeeping, the follower
//! threshold and per-candidate states. It is built fresh for a new seed or
//! reconstructed from a persisted graph.

use crate::crawler::encounters::EncounterCounts;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::directory::ArtistProfile;
use crate::graph::{ArtistId, ArtistRecord, SocialGraph};
use crate::state::CandidateState;
use crate::storage::LoadedGraph;
use crate::{EchoError, Result};
use std::collections::{HashMap, HashSet, VecDeque};

/// Admission ceiling on follower counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerThreshold {
    /// No candidate has been visited yet
    Unset,
    Fixed(u64),
    /// The first candidate's follower count was unavailable; gating is off
    Unavailable,
}

impl FollowerThreshold {
    /// Returns true if `follower_count` is over the ceiling
    ///
    /// An unavailable count never exceeds the threshold.
    pub fn is_exceeded_by(&self, follower_count: Option<u64>) -> bool {
        match (self, follower_count) {
            (Self::Fixed(limit), Some(count)) => count > *limit,
            _ => false,
        }
    }
}

/// Result of the admission gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admit,
    Deferred { priority: f64 },
}

/// Most recently explored seeds, oldest first
#[derive(Debug, Clone)]
pub struct RecentSeeds {
    seeds: VecDeque<ArtistId>,
    capacity: usize,
}

impl RecentSeeds {
    pub fn new(capacity: usize) -> Self {
        Self {
            seeds: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a seed, dropping the oldest one when full
    pub fn push(&mut self, id: ArtistId) {
        self.seeds.retain(|s| *s != id);
        if self.seeds.len() == self.capacity {
            self.seeds.pop_front();
        }
        self.seeds.push_back(id);
    }

    pub fn remove(&mut self, id: ArtistId) {
        self.seeds.retain(|s| *s != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = ArtistId> + '_ {
        self.seeds.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

/// Mutable state of one crawl
#[derive(Debug)]
pub struct CrawlSession {
    pub graph: SocialGraph,
    pub encounters: EncounterCounts,
    pub explored: HashSet<ArtistId>,
    pub recent_seeds: RecentSeeds,
    pub threshold: FollowerThreshold,
    pub shuffled: HashSet<ArtistId>,
    pub frontier: Frontier,
    states: HashMap<ArtistId, CandidateState>,
}

impl CrawlSession {
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            graph: SocialGraph::new(),
            encounters: EncounterCounts::new(),
            explored: HashSet::new(),
            recent_seeds: RecentSeeds::new(recent_capacity),
            threshold: FollowerThreshold::Unset,
            shuffled: HashSet::new(),
            frontier: Frontier::new(),
            states: HashMap::new(),
        }
    }

    /// Starts a session from a single resolved seed
    ///
    /// The seed gets an encounter count of 1 and is scheduled at priority 1.
    pub fn for_seed(seed: ArtistId, recent_capacity: usize) -> Self {
        let mut session = Self::new(recent_capacity);
        session.encounters.increment(seed);
        session.frontier.schedule(seed, 1.0);
        session
    }

    /// Rebuilds a session from a persisted graph
    ///
    /// Explored nodes become the explored set and, in node order, the recent
    /// seeds. Encounter counts come from the stored column, falling back to the
    /// number of explored nodes with an edge into the node. Every unexplored
    /// node is scheduled at its encounter count. The follower threshold is
    /// fixed from the first explored node when its follower count is known.
    pub fn from_loaded(loaded: LoadedGraph, recent_capacity: usize) -> Self {
        let LoadedGraph {
            graph, encounters, ..
        } = loaded;
        let mut session = Self::new(recent_capacity);
        let in_degrees = graph.explored_in_degrees();

        for node in graph.nodes() {
            let count = encounters
                .get(&node.id)
                .or_else(|| in_degrees.get(&node.id))
                .copied()
                .unwrap_or(0);
            if count > 0 {
                session.encounters.raise_to(node.id, count);
            }

            if node.explored {
                if session.threshold == FollowerThreshold::Unset {
                    if let Some(followers) = node.attributes.follower_count {
                        session.threshold = FollowerThreshold::Fixed(followers);
                    }
                }
                session.explored.insert(node.id);
                session.recent_seeds.push(node.id);
                session.states.insert(node.id, CandidateState::Explored);
            } else {
                session.frontier.schedule(node.id, count as f64);
            }
        }

        session.graph = graph;
        session
    }

    /// Returns true if some unexplored artist has a nonzero encounter count
    pub fn has_encountered_candidates(&self) -> bool {
        self.encounters
            .iter()
            .any(|(id, count)| count > 0 && !self.explored.contains(&id))
    }

    /// Schedules every unexplored artist with a nonzero encounter count
    ///
    /// # Returns
    ///
    /// The number of artists scheduled
    pub fn schedule_encountered(&mut self) -> usize {
        let mut pending: Vec<(ArtistId, u64)> = self
            .encounters
            .iter()
            .filter(|(id, count)| *count > 0 && !self.explored.contains(id))
            .collect();
        pending.sort();
        for (id, count) in &pending {
            self.frontier.schedule(*id, *count as f64);
        }
        pending.len()
    }

    pub fn state_of(&self, id: ArtistId) -> CandidateState {
        self.states
            .get(&id)
            .copied()
            .unwrap_or(CandidateState::Pending)
    }

    /// Moves `id` to `to`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, id: ArtistId, to: CandidateState) -> Result<()> {
        let from = self.state_of(id);
        if !from.can_transition_to(to) {
            return Err(EchoError::InvalidTransition {
                artist: id,
                from,
                to,
            });
        }
        tracing::trace!("Artist {}: {} -> {}", id, from, to);
        self.states.insert(id, to);
        Ok(())
    }

    /// Schedules `id`, returning a failed candidate to pending first
    pub fn schedule(&mut self, id: ArtistId, priority: f64) -> Result<()> {
        if self.state_of(id) == CandidateState::Failed {
            self.transition(id, CandidateState::Pending)?;
        }
        self.frontier.schedule(id, priority);
        Ok(())
    }

    /// Pops the highest-priority entry that has not been explored yet
    pub fn next_pending(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.frontier.pop_highest() {
            if self.explored.contains(&entry.id) {
                tracing::trace!("Discarding explored artist {} from frontier", entry.id);
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Runs the admission gate for an admitted candidate
    ///
    /// The first candidate of a session fixes the threshold and is admitted.
    /// Later candidates over the threshold are deferred once: rescheduled at
    /// `deferral_factor` of their priority and marked shuffled.
    pub fn admission(
        &mut self,
        entry: FrontierEntry,
        follower_count: Option<u64>,
        deferral_factor: f64,
    ) -> Result<Admission> {
        if self.threshold == FollowerThreshold::Unset {
            self.threshold = match follower_count {
                Some(count) => FollowerThreshold::Fixed(count),
                None => {
                    tracing::warn!(
                        "Follower count of first artist {} unavailable, admission gate disabled",
                        entry.id
                    );
                    FollowerThreshold::Unavailable
                }
            };
            tracing::info!("Follower threshold set to {:?}", self.threshold);
            return Ok(Admission::Admit);
        }

        if self.shuffled.contains(&entry.id) || !self.threshold.is_exceeded_by(follower_count) {
            return Ok(Admission::Admit);
        }

        let priority = entry.priority * deferral_factor;
        self.transition(entry.id, CandidateState::Deferred)?;
        self.transition(entry.id, CandidateState::Pending)?;
        self.shuffled.insert(entry.id);
        self.frontier.schedule(entry.id, priority);
        tracing::debug!(
            "Deferred artist {} ({:?} followers) from priority {} to {}",
            entry.id,
            follower_count,
            entry.priority,
            priority
        );
        Ok(Admission::Deferred { priority })
    }

    /// Records `profile` as explored and remembers it as a recent seed
    pub fn mark_explored(&mut self, profile: &ArtistProfile) -> Result<()> {
        self.transition(profile.id, CandidateState::Explored)?;
        self.graph.upsert_node(ArtistRecord::explored(
            profile.id,
            profile.name.clone(),
            profile.attributes.clone(),
        ));
        self.explored.insert(profile.id);
        self.recent_seeds.push(profile.id);
        Ok(())
    }

    /// Adds the edge `candidate -> followed` after a confirmed follow-back
    ///
    /// The followed artist gains an encounter and is scheduled at its count.
    pub fn record_confirmed(&mut self, candidate: ArtistId, followed: &ArtistProfile) -> Result<()> {
        let count = self.encounters.increment(followed.id);
        self.schedule(followed.id, count as f64)?;
        if !self.graph.contains(followed.id) {
            self.graph.upsert_node(ArtistRecord::discovered(
                followed.id,
                followed.name.clone(),
                followed.attributes.clone(),
            ));
        }
        self.graph.add_edge(candidate, followed.id);
        Ok(())
    }

    /// Flushes `skip_list` back into the frontier with decayed priorities
    ///
    /// Each entry is rescheduled at `floor(priority * factor)`, at least 1.
    pub fn apply_cascade(&mut self, skip_list: &mut Vec<FrontierEntry>, factor: f64) {
        for entry in skip_list.drain(..) {
            let priority = (entry.priority * factor).floor().max(1.0);
            self.frontier.schedule(entry.id, priority);
        }
    }
}
