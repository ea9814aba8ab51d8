//! Storage traits and error types
//!
//! This module defines the trait interface for graph storage backends and
//! associated error types.

use crate::graph::{ArtistId, SocialGraph};
use crate::storage::{LoadedGraph, SessionRecord, SessionStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Artist id {0} does not fit in a database integer")]
    IdOutOfRange(ArtistId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for graph storage backend implementations
pub trait GraphStore {
    // ===== Graph =====

    /// Replaces the stored graph with `graph` in one transaction
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph to persist, written in node order
    /// * `encounters` - Encounter counts to store alongside each node
    fn save_graph(
        &mut self,
        graph: &SocialGraph,
        encounters: &HashMap<ArtistId, u64>,
    ) -> StorageResult<()>;

    /// Loads the stored graph, skipping malformed rows
    fn load_graph(&self) -> StorageResult<LoadedGraph>;

    // ===== Session Management =====

    /// Creates a new crawl session
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed profile URL or the resumed graph path
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created session
    fn create_session(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord>;

    /// Gets the most recent session
    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>>;

    /// Records the final status of a session with a finish timestamp
    fn finish_session(&mut self, session_id: i64, status: SessionStatus) -> StorageResult<()>;
}
