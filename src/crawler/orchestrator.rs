//! Crawl orchestrator - main crawl loop
//!
//! This module contains the loop that drives a crawl session, including:
//! - Admitting candidates through the follower-threshold gate
//! - Expanding following lists and confirming mutual follows
//! - Choosing the next candidate with a re-confirmation sweep
//! - Periodic checkpoints and cache eviction
//! - Bootstrapping a resumed session whose frontier would be empty

use crate::config::{Config, FailedExpansionPolicy};
use crate::crawler::cache::ConnectionCache;
use crate::crawler::confirm::MutualConfirmation;
use crate::crawler::frontier::FrontierEntry;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::session::{Admission, CrawlSession, FollowerThreshold};
use crate::directory::{ArtistProfile, DirectoryClient};
use crate::graph::ArtistId;
use crate::state::CandidateState;
use crate::storage::{GraphStore, SessionStatus};
use crate::{DirectoryError, EchoError, Result};
use std::time::{Duration, Instant};

/// Totals reported when a crawl session ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub session_id: i64,
    pub explored: u64,
    pub deferred: u64,
    pub failed: u64,
    pub nodes: usize,
    pub edges: usize,
}

/// What happened to one popped candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Explored,
    Deferred,
    Failed,
}

/// Main crawl orchestrator
pub struct Orchestrator<D, S> {
    config: Config,
    directory: D,
    store: S,
    session: CrawlSession,
    cache: ConnectionCache,
    confirmation: MutualConfirmation,
    retry: RetryPolicy,
    session_id: i64,
    summary: CrawlSummary,
}

impl<D: DirectoryClient, S: GraphStore> Orchestrator<D, S> {
    fn with_session(
        config: Config,
        directory: D,
        store: S,
        session: CrawlSession,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.crawler);
        let confirmation = MutualConfirmation::new(retry, config.tuning.boost_cap);
        Self {
            config,
            directory,
            store,
            session,
            cache: ConnectionCache::new(),
            confirmation,
            retry,
            session_id: 0,
            summary: CrawlSummary::default(),
        }
    }

    /// Creates an orchestrator for a fresh crawl from a resolved seed
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `directory` - Remote artist directory
    /// * `store` - Graph store the crawl checkpoints into
    /// * `seed` - The resolved seed artist
    /// * `seed_label` - The seed as given by the user, recorded on the session row
    /// * `config_hash` - Hash of the configuration file
    pub fn start_new_session(
        config: Config,
        directory: D,
        mut store: S,
        seed: ArtistId,
        seed_label: &str,
        config_hash: &str,
    ) -> Result<Self> {
        let session = CrawlSession::for_seed(seed, config.crawler.recent_seeds_capacity);
        let session_id = store.create_session(seed_label, config_hash)?;
        tracing::info!("Created session {} for seed artist {}", session_id, seed);

        let mut orchestrator = Self::with_session(config, directory, store, session);
        orchestrator.session_id = session_id;
        Ok(orchestrator)
    }

    /// Creates an orchestrator that continues the graph held by `store`
    ///
    /// Runs bootstrap enrichment when no unexplored artist has a nonzero
    /// encounter count.
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(EchoError::Session)` - The graph has no explored artists, or
    ///   bootstrap enrichment found nothing to crawl
    pub async fn resume_session(
        config: Config,
        directory: D,
        store: S,
        graph_label: &str,
        config_hash: &str,
    ) -> Result<Self> {
        let loaded = store.load_graph()?;
        if loaded.graph.explored_count() == 0 {
            return Err(EchoError::Session(format!(
                "{} has no explored artists to resume from",
                graph_label
            )));
        }
        tracing::info!(
            "Loaded {} artists ({} explored) and {} follows from {}",
            loaded.graph.node_count(),
            loaded.graph.explored_count(),
            loaded.graph.edge_count(),
            graph_label
        );

        let session = CrawlSession::from_loaded(loaded, config.crawler.recent_seeds_capacity);
        let mut orchestrator = Self::with_session(config, directory, store, session);

        if !orchestrator.session.has_encountered_candidates() {
            orchestrator.bootstrap_enrichment().await?;
        }

        orchestrator.session_id = orchestrator
            .store
            .create_session(graph_label, config_hash)?;
        tracing::info!(
            "Resumed as session {} with {} pending artists",
            orchestrator.session_id,
            orchestrator.session.frontier.len()
        );
        Ok(orchestrator)
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// Runs the crawl until the frontier drains
    ///
    /// The session row is completed on success and marked failed when the
    /// crawl terminates with an error.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        tracing::info!(
            "Starting crawl session {} with {} pending artists",
            self.session_id,
            self.session.frontier.len()
        );
        let start_time = Instant::now();

        match self.crawl_loop().await {
            Ok(()) => {
                self.store
                    .finish_session(self.session_id, SessionStatus::Completed)?;
                self.summary.session_id = self.session_id;
                self.summary.nodes = self.session.graph.node_count();
                self.summary.edges = self.session.graph.edge_count();
                tracing::info!(
                    "Crawl completed: {} artists explored, {} nodes, {} edges in {:?}",
                    self.summary.explored,
                    self.summary.nodes,
                    self.summary.edges,
                    start_time.elapsed()
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                tracing::error!("Crawl session {} failed: {}", self.session_id, e);
                if let Err(status_err) = self
                    .store
                    .finish_session(self.session_id, SessionStatus::Failed)
                {
                    tracing::warn!("Could not mark session as failed: {}", status_err);
                }
                Err(e)
            }
        }
    }

    async fn crawl_loop(&mut self) -> Result<()> {
        let delay = Duration::from_millis(self.config.crawler.iteration_delay);
        let mut next = self.session.next_pending();

        while let Some(entry) = next {
            next = match self.process_candidate(entry).await? {
                Outcome::Explored => {
                    self.after_exploration()?;
                    self.reconfirmation_sweep().await?
                }
                Outcome::Deferred => {
                    self.summary.deferred += 1;
                    self.session.next_pending()
                }
                Outcome::Failed => {
                    self.summary.failed += 1;
                    self.session.next_pending()
                }
            };
            tokio::time::sleep(delay).await;
        }

        tracing::info!("Frontier is empty, writing final checkpoint");
        self.checkpoint()
    }

    /// Admits, expands and records one candidate
    async fn process_candidate(&mut self, entry: FrontierEntry) -> Result<Outcome> {
        let id = entry.id;
        self.session.transition(id, CandidateState::Admitted)?;

        let profile = match self.fetch_profile(id).await {
            Ok(profile) => profile,
            Err(e) if aborts_candidate(&e) => return self.abort(entry, e),
            Err(e) => return Err(e),
        };

        let admission = self.session.admission(
            entry,
            profile.attributes.follower_count,
            self.config.tuning.deferral_factor,
        )?;
        if let Admission::Deferred { .. } = admission {
            return Ok(Outcome::Deferred);
        }

        self.session.transition(id, CandidateState::Expanding)?;
        let operation = format!("fetch following of {}", id);
        let following = match self
            .retry
            .run(&operation, || self.directory.fetch_following(id))
            .await
        {
            Ok(following) => following,
            Err(e) if aborts_candidate(&e) => return self.abort(entry, e),
            Err(e) => return Err(e),
        };

        self.session.mark_explored(&profile)?;

        let mut confirmed = 0;
        for followed in &following {
            if followed.id == id {
                continue;
            }
            if self.session.explored.contains(&followed.id) {
                self.session.graph.add_edge(id, followed.id);
                continue;
            }
            if self.confirm(id, followed.id).await? {
                self.session.record_confirmed(id, followed)?;
                confirmed += 1;
            }
        }

        tracing::info!(
            "Explored {} ({}): {} followings, {} new mutual",
            profile.name,
            id,
            following.len(),
            confirmed
        );
        Ok(Outcome::Explored)
    }

    async fn fetch_profile(&self, id: ArtistId) -> Result<ArtistProfile> {
        let operation = format!("fetch profile of {}", id);
        self.retry
            .run(&operation, || self.directory.fetch_profile(id))
            .await
    }

    fn abort(&mut self, entry: FrontierEntry, error: EchoError) -> Result<Outcome> {
        tracing::warn!("Giving up on artist {} for now: {}", entry.id, error);
        self.session.transition(entry.id, CandidateState::Failed)?;
        if self.config.crawler.failed_expansion == FailedExpansionPolicy::Reschedule {
            self.session.schedule(entry.id, entry.priority)?;
        }
        Ok(Outcome::Failed)
    }

    /// Follow-back check that treats exhausted retries as "not confirmed"
    async fn confirm(&mut self, source: ArtistId, target: ArtistId) -> Result<bool> {
        let result = self
            .confirmation
            .follow_back(
                &self.directory,
                &mut self.cache,
                &mut self.session.encounters,
                source,
                target,
            )
            .await;

        match result {
            Ok(confirmed) => Ok(confirmed),
            Err(e) if aborts_candidate(&e) => {
                tracing::warn!(
                    "Treating {} -> {} as unconfirmed: {}",
                    target,
                    source,
                    e
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn mutually_confirmed(&mut self, seed: ArtistId, candidate: ArtistId) -> Result<bool> {
        Ok(self.confirm(seed, candidate).await? && self.confirm(candidate, seed).await?)
    }

    fn after_exploration(&mut self) -> Result<()> {
        self.summary.explored += 1;
        let explored = self.summary.explored;

        if explored % u64::from(self.config.crawler.checkpoint_interval) == 0 {
            self.checkpoint()?;
        }
        if explored % u64::from(self.config.crawler.cache_clear_interval) == 0 {
            self.cache.evict_unused();
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let head: Vec<String> = self
                .session
                .frontier
                .peek_top(10)
                .iter()
                .map(|e| format!("{}:{}", e.id, e.priority))
                .collect();
            tracing::debug!("Frontier head: [{}]", head.join(", "));
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.store
            .save_graph(&self.session.graph, self.session.encounters.as_map())?;
        tracing::info!(
            "Checkpoint: {} artists ({} explored), {} follows, {} pending",
            self.session.graph.node_count(),
            self.session.graph.explored_count(),
            self.session.graph.edge_count(),
            self.session.frontier.len()
        );
        Ok(())
    }

    /// True if the sweep should set `candidate` aside for its follower count
    ///
    /// A failed profile fetch accepts the candidate.
    async fn sweep_violation(&self, candidate: ArtistId) -> bool {
        if self.session.shuffled.contains(&candidate)
            || !matches!(self.session.threshold, FollowerThreshold::Fixed(_))
        {
            return false;
        }
        match self.fetch_profile(candidate).await {
            Ok(profile) => self
                .session
                .threshold
                .is_exceeded_by(profile.attributes.follower_count),
            Err(e) => {
                tracing::warn!(
                    "Profile of {} unavailable during sweep, accepting it: {}",
                    candidate,
                    e
                );
                false
            }
        }
    }

    /// Picks the next candidate by re-testing frontier entries against recent seeds
    ///
    /// Candidates are tested against each recent seed, oldest first, for a
    /// mutual follow in both directions. Unconfirmed candidates go on a skip
    /// list that is flushed back into the frontier with decayed priorities. A
    /// seed whose test drains the frontier is dropped from the recent seeds.
    async fn reconfirmation_sweep(&mut self) -> Result<Option<FrontierEntry>> {
        let Some(mut candidate) = self.session.next_pending() else {
            return Ok(None);
        };

        let seeds: Vec<ArtistId> = self.session.recent_seeds.iter().collect();
        let sweep_factor = self.config.tuning.sweep_deferral_factor;
        let cascade_factor = self.config.tuning.cascade_factor;
        let mut skip_list: Vec<FrontierEntry> = Vec::new();

        for seed in seeds {
            loop {
                if self.mutually_confirmed(seed, candidate.id).await? {
                    if !self.sweep_violation(candidate.id).await {
                        self.session.apply_cascade(&mut skip_list, cascade_factor);
                        tracing::debug!(
                            "Sweep picked {} (mutual with seed {})",
                            candidate.id,
                            seed
                        );
                        return Ok(Some(candidate));
                    }
                    self.session.shuffled.insert(candidate.id);
                    skip_list.push(FrontierEntry {
                        id: candidate.id,
                        priority: candidate.priority * sweep_factor,
                    });
                    self.session.apply_cascade(&mut skip_list, cascade_factor);
                } else {
                    skip_list.push(candidate);
                }

                match self.session.next_pending() {
                    Some(entry) => candidate = entry,
                    None => {
                        tracing::debug!("Seed {} exhausted by sweep", seed);
                        self.session.apply_cascade(&mut skip_list, cascade_factor);
                        self.session.recent_seeds.remove(seed);
                        match self.session.next_pending() {
                            Some(entry) => {
                                candidate = entry;
                                break;
                            }
                            None => return Ok(None),
                        }
                    }
                }
            }
        }

        Ok(Some(candidate))
    }

    /// Boosts encounter counts from the favorites of explored seeds
    ///
    /// Seeds are tried in node order until some unexplored artist has a
    /// nonzero count, then every such artist is scheduled.
    async fn bootstrap_enrichment(&mut self) -> Result<()> {
        tracing::info!("No encountered candidates left, running bootstrap enrichment");
        let seeds: Vec<ArtistId> = self
            .session
            .graph
            .nodes()
            .filter(|n| n.explored)
            .map(|n| n.id)
            .collect();
        let cap = self.config.tuning.bootstrap_boost_cap;

        for seed in seeds {
            self.confirmation
                .enrich(&self.directory, &mut self.session.encounters, seed, cap)
                .await;
            if self.session.has_encountered_candidates() {
                break;
            }
        }

        let scheduled = self.session.schedule_encountered();
        if scheduled == 0 {
            return Err(EchoError::Session(
                "bootstrap enrichment found no artists to crawl".to_string(),
            ));
        }
        tracing::info!("Bootstrap enrichment scheduled {} artists", scheduled);
        Ok(())
    }
}

/// Errors that end work on one candidate without terminating the crawl
///
/// Every remote failure qualifies except a broken pagination cursor.
fn aborts_candidate(error: &EchoError) -> bool {
    match error {
        EchoError::PermanentFailure { .. } => true,
        EchoError::Directory(DirectoryError::CursorParse(_)) => false,
        EchoError::Directory(_) => true,
        _ => false,
    }
}
