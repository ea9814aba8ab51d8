//! Union of previously persisted graphs

use crate::graph::SocialGraph;

/// Merges graphs into one
///
/// Nodes and edges are unioned. When an artist appears in several graphs, the
/// attributes of the later graph win and the explored flag is the logical OR of
/// every source. Artists are keyed by their remote id, so no relabeling is needed.
pub fn merge_graphs(graphs: &[SocialGraph]) -> SocialGraph {
    let mut merged = SocialGraph::new();

    for graph in graphs {
        for node in graph.nodes() {
            merged.upsert_node(node.clone());
        }
        for (from, to) in graph.edges() {
            merged.add_edge(from, to);
        }
    }

    tracing::info!(
        "Merged {} graphs into {} artists and {} follows",
        graphs.len(),
        merged.node_count(),
        merged.edge_count()
    );

    merged
}
