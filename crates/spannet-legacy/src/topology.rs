//! Index-based legacy topology.
//!
//! Nodes and edges live in plain vectors and refer to each other by
//! position. Each node keeps one [`NodeInterface`] per incident edge: the
//! unit direction pointing from the node out along that edge. Chains are
//! ordered runs of edge indices.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use spannet_core::{Error, Frame, Id, Line, Result};

// ============================================================================
// Settings
// ============================================================================

/// Tunables for building and crawling a legacy network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySettings {
    /// Force the two interfaces of every valence-2 node to be exactly opposite.
    pub enforce_continuity_in_pairs: bool,
    /// Line endpoints closer than this become one node.
    pub node_merge_distance: f64,
    /// Search radius when taking node normals from a surface mesh.
    pub mesh_max_distance: f64,
    /// Maximum edges walked in each direction by a single crawl.
    pub max_crawl_steps: usize,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            enforce_continuity_in_pairs: true,
            node_merge_distance: 5.0,
            mesh_max_distance: 100.0,
            max_crawl_steps: 100,
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// One incident edge as seen from a node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeInterface {
    /// Unit direction from the node along the edge.
    pub direction: DVec3,
    /// Index of the edge.
    pub edge: usize,
    pub weight: i32,
    /// Free scalar; branching classification stores the left/right sort key here.
    pub scalar: f64,
}

impl NodeInterface {
    pub fn new(direction: DVec3, edge: usize) -> Self {
        Self {
            direction,
            edge,
            weight: 1,
            scalar: 0.0,
        }
    }
}

/// Classification data for a branching node.
///
/// `trunk`, `left` and `right` index into the node's interfaces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BranchData {
    pub trunk: usize,
    pub left: usize,
    pub right: usize,
    pub weights: Vec<i32>,
}

impl BranchData {
    /// Layout produced by left/right sorting: trunk first, then left, right.
    pub fn sorted(weights: Vec<i32>) -> Self {
        Self {
            trunk: 0,
            left: 1,
            right: 2,
            weights,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum NodeKind {
    #[default]
    Ordinary,
    /// End of the structure: exactly one edge.
    Foot,
    /// Junction split into a trunk and two branches.
    Branching(BranchData),
}

impl NodeKind {
    /// Name used in the legacy document format.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Ordinary => "Node",
            Self::Foot => "FootNode",
            Self::Branching(_) => "BranchingNode",
        }
    }
}

/// How material flows through a branching node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchCondition {
    SplitToLeft,
    SplitToRight,
    MergeFromLeft,
    MergeFromRight,
}

impl BranchCondition {
    /// Condition for travel entering through the trunk (a split) or through
    /// a branch (a merge), on the left or right side.
    pub fn new(from_trunk: bool, left: bool) -> Self {
        match (from_trunk, left) {
            (true, true) => Self::SplitToLeft,
            (true, false) => Self::SplitToRight,
            (false, true) => Self::MergeFromLeft,
            (false, false) => Self::MergeFromRight,
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Self::SplitToLeft | Self::SplitToRight)
    }
}

/// A node of the legacy network.
#[derive(Clone, Debug, PartialEq)]
pub struct LegacyNode {
    pub interfaces: Vec<NodeInterface>,
    pub frame: Frame,
    /// Indices of chains passing through this node.
    pub chains: Vec<usize>,
    pub kind: NodeKind,
}

impl LegacyNode {
    pub fn new(frame: Frame) -> Self {
        Self {
            interfaces: Vec::new(),
            frame,
            chains: Vec::new(),
            kind: NodeKind::Ordinary,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn valence(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_foot(&self) -> bool {
        matches!(self.kind, NodeKind::Foot)
    }

    pub fn branch_data(&self) -> Option<&BranchData> {
        match &self.kind {
            NodeKind::Branching(data) => Some(data),
            _ => None,
        }
    }

    /// Position of the interface for `edge`.
    pub fn interface_of(&self, edge: usize) -> Option<usize> {
        self.interfaces.iter().position(|ni| ni.edge == edge)
    }

    /// The trunk interface of a branching node.
    pub fn trunk(&self) -> Option<&NodeInterface> {
        self.branch_data()
            .and_then(|data| self.interfaces.get(data.trunk))
    }
}

// ============================================================================
// Edges and chains
// ============================================================================

/// An edge of the legacy network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegacyEdge {
    /// Node indices at either end.
    pub ends: (usize, usize),
    pub frame: Option<Frame>,
    /// Polyline geometry, from the first end to the second.
    pub curve: Vec<DVec3>,
    pub weight: f64,
}

impl LegacyEdge {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            ends: (i, j),
            ..Self::default()
        }
    }

    /// The end opposite `node`, if `node` is an end.
    pub fn other(&self, node: usize) -> Option<usize> {
        match self.ends {
            (i, j) if i == node => Some(j),
            (i, j) if j == node => Some(i),
            _ => None,
        }
    }

    pub fn shares_end_with(&self, other: &LegacyEdge) -> bool {
        let (a, b) = self.ends;
        let (c, d) = other.ends;
        a == c || a == d || b == c || b == d
    }
}

/// An ordered run of edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    pub id: Id,
    pub edges: Vec<usize>,
    /// Node indices along the chain, one more than the edges when continuous.
    pub vertices: Vec<usize>,
}

impl Chain {
    pub fn new(edges: Vec<usize>) -> Self {
        Self {
            id: Id::new(),
            edges,
            vertices: Vec::new(),
        }
    }

    /// Fill `vertices` by walking the edges in order.
    ///
    /// Returns `false` if consecutive edges do not share a node; the
    /// vertices are then just the distinct end nodes in order of appearance.
    pub fn find_vertices(&mut self, edges: &[LegacyEdge]) -> bool {
        self.vertices.clear();
        let ends: Vec<(usize, usize)> = self
            .edges
            .iter()
            .filter_map(|e| edges.get(*e).map(|edge| edge.ends))
            .collect();
        if ends.len() != self.edges.len() {
            self.fill_distinct(&ends);
            return false;
        }
        let Some(&(a, b)) = ends.first() else {
            return true;
        };

        let mut current = match ends.get(1) {
            Some(&(c, d)) if b == c || b == d => a,
            Some(&(c, d)) if a == c || a == d => b,
            Some(_) => {
                self.fill_distinct(&ends);
                return false;
            }
            None => a,
        };
        self.vertices.push(current);
        for &(i, j) in &ends {
            current = if i == current {
                j
            } else if j == current {
                i
            } else {
                self.fill_distinct(&ends);
                return false;
            };
            self.vertices.push(current);
        }
        true
    }

    fn fill_distinct(&mut self, ends: &[(usize, usize)]) {
        self.vertices.clear();
        for &(i, j) in ends {
            for v in [i, j] {
                if !self.vertices.contains(&v) {
                    self.vertices.push(v);
                }
            }
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Index-based network of nodes, edges and discovered chains.
#[derive(Clone, Debug, Default)]
pub struct LegacyNetwork {
    pub nodes: Vec<LegacyNode>,
    pub edges: Vec<LegacyEdge>,
    pub chains: Vec<Chain>,
    pub settings: TopologySettings,
}

impl LegacyNetwork {
    pub fn new(settings: TopologySettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Check that every edge refers to existing, distinct nodes.
    pub(crate) fn check_edges(&self) -> Result<()> {
        for (e, edge) in self.edges.iter().enumerate() {
            let (i, j) = edge.ends;
            if i >= self.nodes.len() || j >= self.nodes.len() {
                return Err(Error::invalid_input(format!(
                    "edge {e} refers to node ({i}, {j}) but there are {} nodes",
                    self.nodes.len()
                )));
            }
            if i == j {
                return Err(Error::invalid_input(format!("edge {e} links node {i} to itself")));
            }
        }
        Ok(())
    }

    fn chain(&self, index: usize) -> Result<&Chain> {
        self.chains.get(index).ok_or_else(|| {
            Error::invalid_input(format!(
                "chain {index} out of range ({} chains)",
                self.chains.len()
            ))
        })
    }

    /// Register a chain and record it on the nodes it passes through.
    ///
    /// Returns the new chain's index.
    pub fn add_chain(&mut self, edges: Vec<usize>) -> Result<usize> {
        if let Some(bad) = edges.iter().find(|e| **e >= self.edges.len()) {
            return Err(Error::invalid_input(format!(
                "chain refers to missing edge {bad}"
            )));
        }
        let mut chain = Chain::new(edges);
        chain.find_vertices(&self.edges);

        let index = self.chains.len();
        for &v in &chain.vertices {
            if let Some(node) = self.nodes.get_mut(v) {
                if !node.chains.contains(&index) {
                    node.chains.push(index);
                }
            }
        }
        self.chains.push(chain);
        Ok(index)
    }

    /// First position in a chain where consecutive edges share no node.
    pub fn check_continuity(&self, chain: usize) -> Result<Option<usize>> {
        let chain = self.chain(chain)?;
        Ok(chain.edges.windows(2).position(|pair| {
            match (self.edges.get(pair[0]), self.edges.get(pair[1])) {
                (Some(a), Some(b)) => !a.shares_end_with(b),
                _ => true,
            }
        }))
    }

    /// Straighten interface directions at every interior node of every chain.
    ///
    /// At each node joining two consecutive chain edges, the two interfaces
    /// are made exactly opposite along their averaged direction.
    pub fn relax_nodes_along_chains(&mut self) {
        for chain in &self.chains {
            if chain.vertices.len() != chain.edges.len() + 1 {
                continue;
            }
            for (k, pair) in chain.edges.windows(2).enumerate() {
                let Some(node) = self.nodes.get_mut(chain.vertices[k + 1]) else {
                    continue;
                };
                let (Some(a), Some(b)) = (node.interface_of(pair[0]), node.interface_of(pair[1]))
                else {
                    continue;
                };
                let av = (node.interfaces[a].direction - node.interfaces[b].direction)
                    .normalize_or_zero();
                node.interfaces[a].direction = av;
                node.interfaces[b].direction = -av;
            }
        }
    }

    /// Follow interface `interface` of `node` to the next node.
    ///
    /// Returns `(edge, node)` indices.
    pub fn next_node(&self, node: usize, interface: usize) -> Result<(usize, usize)> {
        let n = self
            .nodes
            .get(node)
            .ok_or_else(|| Error::invalid_input(format!("node {node} out of range")))?;
        let ni = n.interfaces.get(interface).ok_or_else(|| {
            Error::invalid_input(format!(
                "interface {interface} out of range for node {node}"
            ))
        })?;
        let edge = self
            .edges
            .get(ni.edge)
            .ok_or_else(|| Error::invalid_data(format!("edge {} out of range", ni.edge)))?;
        let next = edge.other(node).ok_or_else(|| {
            Error::invalid_data(format!("edge {} does not touch node {node}", ni.edge))
        })?;
        Ok((ni.edge, next))
    }

    /// Straight segment for every edge.
    pub fn lines(&self) -> Vec<Line> {
        self.edges
            .iter()
            .filter_map(|e| {
                let (i, j) = e.ends;
                Some(Line::new(
                    self.nodes.get(i)?.frame.origin(),
                    self.nodes.get(j)?.frame.origin(),
                ))
            })
            .collect()
    }

    /// Frame of every node.
    pub fn frames(&self) -> Vec<Frame> {
        self.nodes.iter().map(|n| n.frame).collect()
    }

    /// Node origins along a chain, as a polyline.
    pub fn chain_points(&self, chain: usize) -> Result<Vec<DVec3>> {
        let chain = self.chain(chain)?;
        Ok(chain
            .vertices
            .iter()
            .filter_map(|v| self.nodes.get(*v).map(|n| n.frame.origin()))
            .collect())
    }
}
