//! Named node groups.
//!
//! A [`NodeGroup`] is a view: it lists node ids but owns nothing, so nodes
//! removed from the network simply stop resolving.

use serde::{Deserialize, Serialize};
use spannet_core::{Frame, Id};

use crate::element::Attributes;
use crate::network::Network;

/// A named subset of a network's nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    pub nodes: Vec<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Elements two groups have in common.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedElements {
    pub nodes: Vec<Id>,
    pub edges: Vec<Id>,
}

impl NodeGroup {
    pub fn new(name: impl Into<String>, nodes: Vec<Id>) -> Self {
        Self {
            name: name.into(),
            nodes,
            frame: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn contains(&self, id: Id) -> bool {
        self.nodes.contains(&id)
    }

    /// Ids of every edge incident to a member node, in member order.
    ///
    /// An edge joining two members appears twice.
    pub fn incident_edges(&self, network: &Network) -> Vec<Id> {
        self.nodes
            .iter()
            .filter_map(|id| network.get_node(*id))
            .flat_map(|node| node.edges().iter())
            .filter_map(|key| network.edge(*key).map(|e| e.id))
            .collect()
    }

    /// Nodes and edges shared with `other`.
    ///
    /// Nodes keep the order of `self`. Edges are those incident to members
    /// of both groups, de-duplicated, in order of first appearance.
    pub fn get_shared(&self, other: &NodeGroup, network: &Network) -> SharedElements {
        let nodes = self
            .nodes
            .iter()
            .copied()
            .filter(|id| other.contains(*id))
            .collect();

        let theirs = other.incident_edges(network);
        let mut edges: Vec<Id> = Vec::new();
        for id in self.incident_edges(network) {
            if theirs.contains(&id) && !edges.contains(&id) {
                edges.push(id);
            }
        }
        SharedElements { nodes, edges }
    }

    /// Copy of the group with every member id passed through `map`.
    pub(crate) fn remapped(&self, map: impl Fn(Id) -> Id) -> Self {
        Self {
            name: self.name.clone(),
            nodes: self.nodes.iter().map(|id| map(*id)).collect(),
            frame: self.frame,
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Node;

    #[test]
    fn test_get_shared() {
        let mut net = Network::new("groups");
        let keys: Vec<_> = (0..4).map(|_| net.add_node(Node::new())).collect();
        let ids: Vec<Id> = keys.iter().map(|k| net.node(*k).unwrap().id).collect();
        let e01 = net.link(keys[0], keys[1], None).unwrap();
        let e12 = net.link(keys[1], keys[2], None).unwrap();
        net.link(keys[2], keys[3], None).unwrap();

        let left = NodeGroup::new("left", vec![ids[0], ids[1]]);
        let right = NodeGroup::new("right", vec![ids[1], ids[2]]);
        let shared = left.get_shared(&right, &net);

        assert_eq!(shared.nodes, vec![ids[1]]);
        let e01_id = net.edge(e01).unwrap().id;
        let e12_id = net.edge(e12).unwrap().id;
        assert_eq!(shared.edges, vec![e01_id, e12_id]);
    }

    #[test]
    fn test_shared_edges_deduplicated() {
        let mut net = Network::new("groups");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let e = net.link(a, b, None).unwrap();
        let ids = vec![net.node(a).unwrap().id, net.node(b).unwrap().id];

        let g = NodeGroup::new("both", ids.clone());
        let shared = g.get_shared(&g.clone(), &net);
        assert_eq!(shared.nodes, ids);
        assert_eq!(shared.edges, vec![net.edge(e).unwrap().id]);
    }

    #[test]
    fn test_missing_members_are_ignored() {
        let net = Network::new("empty");
        let g = NodeGroup::new("ghosts", vec![Id::new()]);
        assert!(g.incident_edges(&net).is_empty());
        assert!(g.get_shared(&g, &net).edges.is_empty());
    }
}
