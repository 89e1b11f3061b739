//! Conversion from the legacy topology into an identifier-based [`Network`].

use log::debug;
use serde_json::Value;
use spannet_core::{Error, Result};
use spannet_graph::{Network, Node, NodeKey};

use crate::topology::{LegacyNetwork, NodeKind};

pub const FOOT_NODE_TAG: &str = "foot_node";
pub const BRANCHING_NODE_TAG: &str = "branching_node";
pub const BRANCH_WEIGHTS_ATTRIBUTE: &str = "branch_weights";

impl LegacyNetwork {
    /// Build a [`Network`] with one spatial node per legacy node.
    ///
    /// Feet and branching nodes are tagged; branch weights are kept as an
    /// attribute. Edges are linked so adjacency stays mutual.
    pub fn to_network(&self, name: impl Into<String>) -> Result<Network> {
        let mut network = Network::new(name);

        let keys: Vec<NodeKey> = self
            .nodes
            .iter()
            .map(|n| {
                let mut node = Node::spatial(n.frame);
                match &n.kind {
                    NodeKind::Foot => node = node.with_tag(FOOT_NODE_TAG),
                    NodeKind::Branching(data) => {
                        node = node.with_tag(BRANCHING_NODE_TAG);
                        if !data.weights.is_empty() {
                            node = node.with_attribute(
                                BRANCH_WEIGHTS_ATTRIBUTE,
                                Value::from(data.weights.clone()),
                            );
                        }
                    }
                    NodeKind::Ordinary => {}
                }
                network.add_node(node)
            })
            .collect();

        for (e, edge) in self.edges.iter().enumerate() {
            let (i, j) = edge.ends;
            let (Some(&a), Some(&b)) = (keys.get(i), keys.get(j)) else {
                return Err(Error::corrupt(format!(
                    "edge {e} refers to node ({i}, {j}) but there are {} nodes",
                    keys.len()
                )));
            };
            network.link(a, b, None)?;
        }

        debug!(
            "Converted legacy network: {} nodes, {} edges",
            network.node_count(),
            network.edge_count()
        );
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{LegacyEdge, TopologySettings};
    use glam::DVec3;
    use spannet_core::Line;

    #[test]
    fn test_to_network_tags_and_links() {
        let lines = vec![
            Line::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0)),
            Line::new(DVec3::ZERO, DVec3::new(-10.0, 0.0, 0.0)),
            Line::new(DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)),
        ];
        let mut legacy =
            LegacyNetwork::from_lines(&lines, TopologySettings::default(), true, None).unwrap();
        if let NodeKind::Branching(data) = &mut legacy.nodes[0].kind {
            data.weights = vec![2, 1, 1];
        }

        let net = legacy.to_network("converted").unwrap();
        assert_eq!(net.name, "converted");
        assert_eq!(net.node_count(), 4);
        assert_eq!(net.edge_count(), 3);
        assert!(net.check_mutual().is_ok());

        let feet = net.nodes().filter(|(_, n)| n.has_tag(FOOT_NODE_TAG)).count();
        let hubs: Vec<&Node> = net
            .nodes()
            .filter(|(_, n)| n.has_tag(BRANCHING_NODE_TAG))
            .map(|(_, n)| n)
            .collect();
        assert_eq!(feet, 3);
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].valence(), 3);
        assert_eq!(
            hubs[0].attributes.get(BRANCH_WEIGHTS_ATTRIBUTE),
            Some(&serde_json::json!([2, 1, 1]))
        );
        assert!(net.nodes().all(|(_, n)| n.is_spatial()));
    }

    #[test]
    fn test_to_network_bad_edge() {
        let mut legacy = LegacyNetwork::new(TopologySettings::default());
        legacy.edges.push(LegacyEdge::new(0, 1));
        assert!(legacy.to_network("bad").unwrap_err().is_corrupt());
    }
}
