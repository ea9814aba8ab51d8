//! Output module for reporting on and combining graph databases
//!
//! This module handles:
//! - Printing statistics of a persisted graph
//! - Merging several graph databases into one

pub mod stats;

pub use stats::{load_statistics, print_statistics, GraphStatistics};

use crate::graph::{merge_graphs, ArtistId};
use crate::storage::{GraphStore, SqliteGraphStore};
use crate::EchoError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Merges graph databases and writes the union to `output_dir/merged.db`
///
/// Later inputs override node attributes of earlier ones. Stored encounter
/// counts are summed per artist.
///
/// # Arguments
///
/// * `inputs` - Graph databases to merge, in override order
/// * `output_dir` - Directory receiving the merged database
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the merged database
/// * `Err(EchoError)` - An input could not be read or the output written
pub fn write_merged_graph(inputs: &[PathBuf], output_dir: &Path) -> Result<PathBuf, EchoError> {
    let mut graphs = Vec::with_capacity(inputs.len());
    let mut encounters: HashMap<ArtistId, u64> = HashMap::new();

    for path in inputs {
        if !path.exists() {
            return Err(EchoError::Session(format!(
                "graph {} does not exist",
                path.display()
            )));
        }
        let loaded = SqliteGraphStore::new(path)?.load_graph()?;
        tracing::info!(
            "Read {} artists and {} follows from {}",
            loaded.graph.node_count(),
            loaded.graph.edge_count(),
            path.display()
        );
        for (id, count) in &loaded.encounters {
            *encounters.entry(*id).or_insert(0) += count;
        }
        graphs.push(loaded.graph);
    }

    let merged = merge_graphs(&graphs);

    std::fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("merged.db");
    let mut store = SqliteGraphStore::new(&output_path)?;
    store.save_graph(&merged, &encounters)?;

    tracing::info!(
        "Wrote merged graph ({} artists, {} follows) to {}",
        merged.node_count(),
        merged.edge_count(),
        output_path.display()
    );
    Ok(output_path)
}
