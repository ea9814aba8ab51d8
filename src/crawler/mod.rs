//! Crawler module for the mutual-follow crawl
//!
//! This module contains the core crawl engine, including:
//! - Frontier scheduling by encounter count
//! - Connection caching and mutual-follow confirmation
//! - Bounded retry of remote calls
//! - Session state and the crawl loop

mod cache;
mod confirm;
mod encounters;
mod frontier;
mod orchestrator;
mod retry;
mod session;

pub use cache::{CacheEntry, ConnectionCache, Lookup};
pub use confirm::MutualConfirmation;
pub use encounters::EncounterCounts;
pub use frontier::{Frontier, FrontierEntry};
pub use orchestrator::{CrawlSummary, Orchestrator};
pub use retry::RetryPolicy;
pub use session::{Admission, CrawlSession, FollowerThreshold, RecentSeeds};

use crate::config::Config;
use crate::directory::{DirectoryClient, SoundCloudClient};
use crate::storage::SqliteGraphStore;
use crate::{EchoError, Result};
use std::path::{Path, PathBuf};

/// Runs a complete crawl from a seed profile URL
///
/// This is the main entry point for a new crawl. It will:
/// 1. Resolve the seed profile URL to an artist id
/// 2. Create `<graph-dir>/<seed name>.db`
/// 3. Crawl until the frontier drains, checkpointing along the way
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `seed_url` - Profile URL of the seed artist
/// * `config_hash` - Hash of the configuration file, stored on the session row
///
/// # Returns
///
/// * `Ok((PathBuf, CrawlSummary))` - Graph path and crawl totals
/// * `Err(EchoError)` - Crawl failed
pub async fn start_new_session(
    config: Config,
    seed_url: &str,
    config_hash: &str,
) -> Result<(PathBuf, CrawlSummary)> {
    let client = SoundCloudClient::new(&config.directory)?;
    let retry = RetryPolicy::from_config(&config.crawler);
    let (name, seed) = retry
        .run("resolve seed profile", || client.resolve_profile_url(seed_url))
        .await?;
    tracing::info!("Resolved {} to {} ({})", seed_url, name, seed);

    let graph_dir = Path::new(&config.output.graph_dir);
    std::fs::create_dir_all(graph_dir)?;
    let graph_path = graph_dir.join(graph_file_name(&name, seed));
    let store = SqliteGraphStore::new(&graph_path)?;

    let mut orchestrator =
        Orchestrator::start_new_session(config, client, store, seed, seed_url, config_hash)?;
    let summary = orchestrator.run().await?;
    Ok((graph_path, summary))
}

/// Continues a crawl from a persisted graph
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `graph_path` - Graph database written by an earlier session
/// * `config_hash` - Hash of the configuration file, stored on the session row
pub async fn resume_session(
    config: Config,
    graph_path: &Path,
    config_hash: &str,
) -> Result<CrawlSummary> {
    if !graph_path.exists() {
        return Err(EchoError::Session(format!(
            "graph {} does not exist",
            graph_path.display()
        )));
    }

    let client = SoundCloudClient::new(&config.directory)?;
    let store = SqliteGraphStore::new(graph_path)?;
    let label = graph_path.display().to_string();

    let mut orchestrator =
        Orchestrator::resume_session(config, client, store, &label, config_hash).await?;
    orchestrator.run().await
}

/// File name for a seed's graph: the display name reduced to safe characters
pub fn graph_file_name(name: &str, seed: crate::graph::ArtistId) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('_');

    if safe.is_empty() {
        format!("artist-{}.db", seed)
    } else {
        format!("{}.db", safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ArtistId;

    #[test]
    fn test_graph_file_name() {
        assert_eq!(graph_file_name("Some Artist", ArtistId(1)), "Some_Artist.db");
        assert_eq!(graph_file_name("dj-x_2", ArtistId(1)), "dj-x_2.db");
        assert_eq!(graph_file_name("../etc", ArtistId(1)), "etc.db");
    }

    #[test]
    fn test_graph_file_name_fallback() {
        assert_eq!(graph_file_name("★★★", ArtistId(42)), "artist-42.db");
        assert_eq!(graph_file_name("   ", ArtistId(7)), "artist-7.db");
    }
}
