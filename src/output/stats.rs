//! Statistics generation from a graph database
//!
//! This module provides functionality for extracting and displaying
//! graph statistics from the storage layer.

use crate::graph::ArtistId;
use crate::storage::{GraphStore, LoadedGraph, SessionRecord};
use crate::EchoError;

/// Graph statistics summary
#[derive(Debug, Clone)]
pub struct GraphStatistics {
    /// Total number of artists in the graph
    pub total_artists: usize,

    /// Artists whose following list was expanded
    pub explored_artists: usize,

    /// Confirmed mutual follows
    pub total_follows: usize,

    /// Rows dropped on load
    pub skipped_nodes: usize,
    pub skipped_edges: usize,

    /// Unexplored artists with the highest encounter counts
    pub top_pending: Vec<(ArtistId, String, u64)>,

    /// Most recent crawl session, if any
    pub latest_session: Option<SessionRecord>,
}

impl GraphStatistics {
    /// Summarises a loaded graph
    ///
    /// Encounter counts fall back to the explored in-degree for nodes
    /// without a stored count.
    pub fn from_loaded(loaded: &LoadedGraph, top: usize) -> Self {
        let graph = &loaded.graph;
        let in_degrees = graph.explored_in_degrees();

        let mut pending: Vec<(ArtistId, String, u64)> = graph
            .nodes()
            .filter(|n| !n.explored)
            .map(|n| {
                let count = loaded
                    .encounters
                    .get(&n.id)
                    .or_else(|| in_degrees.get(&n.id))
                    .copied()
                    .unwrap_or(0);
                (n.id, n.name.clone(), count)
            })
            .collect();
        pending.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        pending.truncate(top);

        Self {
            total_artists: graph.node_count(),
            explored_artists: graph.explored_count(),
            total_follows: graph.edge_count(),
            skipped_nodes: loaded.skipped_nodes,
            skipped_edges: loaded.skipped_edges,
            top_pending: pending,
            latest_session: None,
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The graph store to query
///
/// # Returns
///
/// * `Ok(GraphStatistics)` - Successfully loaded statistics
/// * `Err(EchoError)` - Failed to read the graph
pub fn load_statistics(store: &dyn GraphStore) -> Result<GraphStatistics, EchoError> {
    let loaded = store.load_graph()?;
    let mut stats = GraphStatistics::from_loaded(&loaded, 10);
    stats.latest_session = store.get_latest_session()?;
    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &GraphStatistics) {
    println!("=== Graph Statistics ===\n");

    println!("Overview:");
    println!("  Artists: {}", stats.total_artists);
    println!("  Explored: {}", stats.explored_artists);
    println!(
        "  Pending: {}",
        stats.total_artists - stats.explored_artists
    );
    println!("  Mutual follows: {}", stats.total_follows);
    println!();

    if stats.skipped_nodes > 0 || stats.skipped_edges > 0 {
        println!("Malformed Rows:");
        println!("  Artists skipped: {}", stats.skipped_nodes);
        println!("  Follows skipped: {}", stats.skipped_edges);
        println!();
    }

    if !stats.top_pending.is_empty() {
        println!("Top Pending Artists:");
        for (id, name, count) in &stats.top_pending {
            println!("  {} ({}): {} encounters", name, id, count);
        }
        println!();
    }

    if let Some(session) = &stats.latest_session {
        println!("Latest Session:");
        println!("  #{} {}", session.id, session.status.to_db_string());
        println!("  Seed: {}", session.seed);
        println!("  Started: {}", session.started_at);
        if let Some(finished) = &session.finished_at {
            println!("  Finished: {}", finished);
        }
    }
}
