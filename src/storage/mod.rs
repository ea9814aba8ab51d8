//! Storage module for persisting the social graph
//!
//! This module handles all database operations for the crawl, including:
//! - SQLite database initialization and schema management
//! - Full-graph checkpoints written in a single transaction
//! - Loading a persisted graph for resume, merge and statistics
//! - Session tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteGraphStore, UNAVAILABLE};
pub use traits::{GraphStore, StorageError, StorageResult};

use crate::graph::{ArtistId, SocialGraph};
use crate::EchoError;

use std::collections::HashMap;
use std::path::Path;

/// Opens or creates a graph database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteGraphStore)` - Successfully opened store
/// * `Err(EchoError)` - Failed to open the database
pub fn open_store(path: &Path) -> Result<SqliteGraphStore, EchoError> {
    SqliteGraphStore::new(path)
}

/// A graph read back from storage
#[derive(Debug, Clone, Default)]
pub struct LoadedGraph {
    pub graph: SocialGraph,

    /// Stored encounter counts; nodes without one are absent
    pub encounters: HashMap<ArtistId, u64>,

    /// Node rows skipped because a required column was NULL
    pub skipped_nodes: usize,

    /// Edge rows skipped because an endpoint was missing
    pub skipped_edges: usize,
}

/// Represents a crawl session row
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub seed: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionStatus,
}

/// Status of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
