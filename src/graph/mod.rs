//! Attributed social graph of artists
//!
//! Nodes are artist records keyed by their remote id; a directed edge A -> B means
//! "A follows B and B was confirmed to follow A back". Nodes keep their insertion
//! order, which is also the order explored seeds are replayed in on resume.

mod merge;

pub use merge::merge_graphs;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;

/// Opaque remote identifier of an artist account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtistId(pub u64);

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Profile attributes reported by the platform
///
/// `None` means the platform reported the value as unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistAttributes {
    pub track_count: Option<u64>,
    pub follower_count: Option<u64>,
    pub favorite_count: Option<u64>,
    pub profile_url: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// A node of the social graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRecord {
    pub id: ArtistId,
    pub name: String,
    pub attributes: ArtistAttributes,
    pub explored: bool,
}

impl ArtistRecord {
    /// Creates a record for an artist that has only been discovered
    pub fn discovered(id: ArtistId, name: impl Into<String>, attributes: ArtistAttributes) -> Self {
        Self {
            id,
            name: name.into(),
            attributes,
            explored: false,
        }
    }

    /// Creates a record for an artist whose following list has been expanded
    pub fn explored(id: ArtistId, name: impl Into<String>, attributes: ArtistAttributes) -> Self {
        Self {
            explored: true,
            ..Self::discovered(id, name, attributes)
        }
    }
}

/// Directed mutual-follow graph
///
/// Backed by a petgraph `DiGraph`; node indices follow insertion order.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    graph: DiGraph<ArtistRecord, ()>,
    index: HashMap<ArtistId, NodeIndex>,
}

impl SocialGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node or refreshes an existing one
    ///
    /// Name and attributes are replaced by the incoming record. The explored flag
    /// only ever moves from false to true.
    pub fn upsert_node(&mut self, record: ArtistRecord) {
        match self.index.get(&record.id) {
            Some(&idx) => {
                let existing = &mut self.graph[idx];
                existing.explored |= record.explored;
                existing.name = record.name;
                existing.attributes = record.attributes;
            }
            None => {
                let id = record.id;
                let idx = self.graph.add_node(record);
                self.index.insert(id, idx);
            }
        }
    }

    /// Adds the edge `from -> to`
    ///
    /// Both endpoints must already be nodes. Returns true if the edge is new.
    pub fn add_edge(&mut self, from: ArtistId, to: ArtistId) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            tracing::warn!("Refusing edge {} -> {}: endpoint missing", from, to);
            return false;
        };
        if self.graph.find_edge(a, b).is_some() {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    pub fn node(&self, id: ArtistId) -> Option<&ArtistRecord> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: ArtistId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn has_edge(&self, from: ArtistId, to: ArtistId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ArtistRecord> {
        self.graph.node_weights()
    }

    /// Edges in (from, to) order
    pub fn edges(&self) -> impl Iterator<Item = (ArtistId, ArtistId)> + '_ {
        let mut edges: Vec<(ArtistId, ArtistId)> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()].id, self.graph[e.target()].id))
            .collect();
        edges.sort_unstable();
        edges.into_iter()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn explored_count(&self) -> usize {
        self.nodes().filter(|n| n.explored).count()
    }

    /// For every node, counts the explored nodes with an edge into it
    pub fn explored_in_degrees(&self) -> HashMap<ArtistId, u64> {
        self.graph
            .node_indices()
            .filter_map(|idx| {
                let count = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter(|&source| self.graph[source].explored)
                    .count() as u64;
                (count > 0).then_some((self.graph[idx].id, count))
            })
            .collect()
    }
}
