//! Network statistics.
//!
//! Provides structural counts, the valence distribution and connectivity
//! for a [`Network`].

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::element::NodeKey;
use crate::network::Network;

// ============================================================================
// Types
// ============================================================================

/// Summary statistics about a network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Network name.
    pub name: String,
    /// Total number of nodes.
    pub node_count: usize,
    /// Total number of edges.
    pub edge_count: usize,
    /// Nodes carrying a frame.
    pub spatial_node_count: usize,
    /// Weighted edges.
    pub weighted_edge_count: usize,
    /// Nodes with exactly one edge.
    pub foot_node_count: usize,
    /// Nodes with three or more edges.
    pub branching_node_count: usize,
    /// Nodes without any edges.
    pub orphan_count: usize,
    /// Number of nodes per valence.
    pub valence_distribution: BTreeMap<usize, usize>,
    /// Average edges per node.
    pub avg_valence: f64,
    /// Highest valence.
    pub max_valence: usize,
    /// Connected components, counting orphans as their own component.
    pub connected_components: usize,
    /// Summed straight-line length of edges between spatial nodes.
    pub total_edge_length: f64,
    /// Number of node groups.
    pub group_count: usize,
}

// ============================================================================
// Functions
// ============================================================================

/// Compute statistics for a network.
pub fn compute_stats(network: &Network) -> NetworkStats {
    let node_count = network.node_count();
    let edge_count = network.edge_count();

    let mut valence_distribution: BTreeMap<usize, usize> = BTreeMap::new();
    let mut spatial_node_count = 0;
    let mut total_valence = 0;
    for (_, node) in network.nodes() {
        *valence_distribution.entry(node.valence()).or_insert(0) += 1;
        total_valence += node.valence();
        if node.is_spatial() {
            spatial_node_count += 1;
        }
    }

    let count_where = |pred: fn(usize) -> bool| -> usize {
        valence_distribution
            .iter()
            .filter(|(v, _)| pred(**v))
            .map(|(_, n)| n)
            .sum()
    };
    let orphan_count = count_where(|v| v == 0);
    let foot_node_count = count_where(|v| v == 1);
    let branching_node_count = count_where(|v| v >= 3);

    let avg_valence = if node_count > 0 {
        total_valence as f64 / node_count as f64
    } else {
        0.0
    };
    let max_valence = valence_distribution.keys().next_back().copied().unwrap_or(0);

    let weighted_edge_count = network
        .edges()
        .filter(|(_, e)| e.weight().is_some())
        .count();
    let total_edge_length = network.edges_as_lines().iter().map(|l| l.length()).sum();

    NetworkStats {
        name: network.name.clone(),
        node_count,
        edge_count,
        spatial_node_count,
        weighted_edge_count,
        foot_node_count,
        branching_node_count,
        orphan_count,
        valence_distribution,
        avg_valence,
        max_valence,
        connected_components: connected_components(&to_petgraph(network)),
        total_edge_length,
        group_count: network.groups.len(),
    }
}

/// Project the network onto an undirected petgraph graph.
///
/// Node weights are the network handles; edges with a missing endpoint are
/// left out.
pub fn to_petgraph(network: &Network) -> UnGraph<NodeKey, ()> {
    let mut graph = UnGraph::with_capacity(network.node_count(), network.edge_count());
    let mut indices: HashMap<NodeKey, NodeIndex> = HashMap::new();

    for (key, _) in network.nodes() {
        indices.insert(key, graph.add_node(key));
    }
    for (_, edge) in network.edges() {
        if let Some((s, t)) = edge.endpoints() {
            if let (Some(&a), Some(&b)) = (indices.get(&s), indices.get(&t)) {
                graph.add_edge(a, b, ());
            }
        }
    }
    graph
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Node;
    use glam::DVec3;
    use spannet_core::Frame;

    fn star() -> Network {
        let mut net = Network::new("star");
        let hub = net.add_node(Node::spatial(Frame::at(DVec3::ZERO)));
        for dir in [DVec3::X, DVec3::Y, DVec3::NEG_X] {
            let leaf = net.add_node(Node::spatial(Frame::at(dir * 2.0)));
            net.link(hub, leaf, None).unwrap();
        }
        net
    }

    #[test]
    fn test_star_stats() {
        let stats = compute_stats(&star());
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.spatial_node_count, 4);
        assert_eq!(stats.foot_node_count, 3);
        assert_eq!(stats.branching_node_count, 1);
        assert_eq!(stats.orphan_count, 0);
        assert_eq!(stats.max_valence, 3);
        assert_eq!(stats.valence_distribution.get(&1), Some(&3));
        assert!((stats.avg_valence - 1.5).abs() < 1e-12);
        assert_eq!(stats.connected_components, 1);
        assert!((stats.total_edge_length - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_components_count_orphans() {
        let mut net = star();
        net.add_node(Node::new());
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        net.link_weighted(a, b, 1.0, None).unwrap();

        let stats = compute_stats(&net);
        assert_eq!(stats.connected_components, 3);
        assert_eq!(stats.orphan_count, 1);
        assert_eq!(stats.weighted_edge_count, 1);
        assert_eq!(stats.spatial_node_count, 4);
    }

    #[test]
    fn test_empty_stats() {
        let stats = compute_stats(&Network::new("empty"));
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.avg_valence, 0.0);
        assert_eq!(stats.max_valence, 0);
        assert_eq!(stats.connected_components, 0);
    }
}
