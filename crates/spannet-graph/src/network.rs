//! The identifier-based network store.
//!
//! A [`Network`] owns every node and edge in two generational arenas and
//! keeps, per element kind:
//!
//! - an insertion-ordered list of live handles (the iteration order), and
//! - an id → handle index.
//!
//! The index is allowed to go stale: [`Network::release_node`] and
//! [`Network::release_edge`] drop an element without touching the index,
//! the way an external owner letting go of an element would. Stale entries
//! resolve to `None` on lookup and are purged by [`Network::clean`].
//!
//! All structural mutation goes through [`Network::link`],
//! [`Network::unlink`] and [`Network::remove_node`], which keep every edge
//! present in both of its endpoints' adjacency lists.

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use log::{debug, warn};
use spannet_core::{Error, Frame, Id, Line, Result};

use crate::arena::Arena;
use crate::element::{Edge, EdgeKey, EdgeKind, ElementRef, Node, NodeKey};
use crate::group::NodeGroup;

/// Format version written by this store.
pub const NETWORK_VERSION: u32 = 4;

/// Name given to networks created without one.
pub const DEFAULT_NETWORK_NAME: &str = "Network";

// ============================================================================
// Network
// ============================================================================

/// A mutable graph of identified nodes and edges.
#[derive(Clone, Debug)]
pub struct Network {
    /// Display name.
    pub name: String,
    /// Format version.
    pub version: u32,
    /// Named views over subsets of the nodes.
    pub groups: Vec<NodeGroup>,
    nodes: Arena<NodeKey, Node>,
    edges: Arena<EdgeKey, Edge>,
    node_index: HashMap<Id, NodeKey>,
    edge_index: HashMap<Id, EdgeKey>,
    node_order: Vec<NodeKey>,
    edge_order: Vec<EdgeKey>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_NAME)
    }
}

impl Network {
    /// Create an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: NETWORK_VERSION,
            groups: Vec::new(),
            nodes: Arena::new(),
            edges: Arena::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            node_order: Vec::new(),
            edge_order: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty() && self.edge_order.is_empty()
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Register a node.
    ///
    /// If a live node with the same id is already registered, the new value
    /// is discarded and the existing handle is returned.
    pub fn add_node(&mut self, node: Node) -> NodeKey {
        if let Some(existing) = self.node_key(node.id) {
            return existing;
        }
        let id = node.id;
        let key = self.nodes.insert(node);
        self.node_index.insert(id, key);
        self.node_order.push(key);
        key
    }

    /// Register an edge without wiring it to any node.
    ///
    /// Used by loaders that materialise every element before resolving
    /// references. Idempotent by id, like [`Network::add_node`].
    pub fn add_edge(&mut self, edge: Edge) -> EdgeKey {
        if let Some(existing) = self.edge_key(edge.id) {
            return existing;
        }
        let id = edge.id;
        let key = self.edges.insert(edge);
        self.edge_index.insert(id, key);
        self.edge_order.push(key);
        key
    }

    /// Add a named group.
    pub fn add_group(&mut self, group: NodeGroup) {
        self.groups.push(group);
    }

    /// Find a group by name.
    pub fn group(&self, name: &str) -> Option<&NodeGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    // ------------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------------

    /// Connect two nodes with a plain edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either handle is stale, if `a` and
    /// `b` are the same node, or if `id` is already used by a live edge. The
    /// network is unchanged on error.
    pub fn link(&mut self, a: NodeKey, b: NodeKey, id: Option<Id>) -> Result<EdgeKey> {
        self.link_edge(a, b, Edge::with_id(id.unwrap_or_default()))
    }

    /// Connect two nodes with a weighted edge.
    pub fn link_weighted(
        &mut self,
        a: NodeKey,
        b: NodeKey,
        weight: f64,
        id: Option<Id>,
    ) -> Result<EdgeKey> {
        let edge = Edge::with_id(id.unwrap_or_default()).with_kind(EdgeKind::Weighted(weight));
        self.link_edge(a, b, edge)
    }

    /// Connect two nodes identified by id.
    pub fn link_ids(&mut self, a: Id, b: Id, id: Option<Id>) -> Result<EdgeKey> {
        let (Some(ka), Some(kb)) = (self.node_key(a), self.node_key(b)) else {
            return Err(Error::invalid_input("one or more nodes are null"));
        };
        self.link(ka, kb, id)
    }

    /// Connect two nodes with a caller-built edge.
    ///
    /// Any endpoints already set on `edge` are overwritten.
    pub fn link_edge(&mut self, a: NodeKey, b: NodeKey, mut edge: Edge) -> Result<EdgeKey> {
        if !self.nodes.contains(a) || !self.nodes.contains(b) {
            return Err(Error::invalid_input("one or more nodes are null"));
        }
        if a == b {
            return Err(Error::invalid_input("can't link a node to itself"));
        }
        if self.edge_key(edge.id).is_some() {
            return Err(Error::invalid_input(format!(
                "edge id {} is already in use",
                edge.id
            )));
        }

        edge.start = Some(a);
        edge.end = Some(b);
        let id = edge.id;
        let key = self.edges.insert(edge);
        self.edge_index.insert(id, key);
        self.edge_order.push(key);

        if let Some((na, nb)) = self.nodes.get2_mut(a, b) {
            na.edges.push(key);
            nb.edges.push(key);
        }
        debug!("linked edge {id}");
        Ok(key)
    }

    /// Remove an edge from both endpoints and from the store.
    ///
    /// Returns the removed edge, or `None` if the handle is stale.
    pub fn unlink(&mut self, key: EdgeKey) -> Option<Edge> {
        let mut edge = self.edges.remove(key)?;
        for end in [edge.start, edge.end].into_iter().flatten() {
            if let Some(node) = self.nodes.get_mut(end) {
                if let Some(pos) = node.edges.iter().position(|k| *k == key) {
                    node.edges.remove(pos);
                }
            }
        }
        if self.edge_index.get(&edge.id) == Some(&key) {
            self.edge_index.remove(&edge.id);
        }
        self.edge_order.retain(|k| *k != key);
        edge.start = None;
        edge.end = None;
        debug!("unlinked edge {}", edge.id);
        Some(edge)
    }

    /// Unlink the edge with the given id.
    pub fn unlink_id(&mut self, id: Id) -> Option<Edge> {
        let key = self.edge_key(id)?;
        self.unlink(key)
    }

    /// Remove a node together with every edge attached to it.
    pub fn remove_node(&mut self, key: NodeKey) -> Option<Node> {
        let attached = self.nodes.get(key)?.edges.clone();
        for edge in attached {
            self.unlink(edge);
        }
        let mut node = self.nodes.remove(key)?;
        node.edges.clear();
        if self.node_index.get(&node.id) == Some(&key) {
            self.node_index.remove(&node.id);
        }
        self.node_order.retain(|k| *k != key);
        debug!("removed node {}", node.id);
        Some(node)
    }

    /// Remove the node with the given id.
    pub fn remove_node_id(&mut self, id: Id) -> Option<Node> {
        let key = self.node_key(id)?;
        self.remove_node(key)
    }

    /// Remove every node with no incident edges, then purge the index.
    ///
    /// Returns the number of nodes removed.
    pub fn cull_orphaned_nodes(&mut self) -> usize {
        let orphans: Vec<NodeKey> = self
            .node_order
            .iter()
            .copied()
            .filter(|k| self.nodes.get(*k).is_some_and(|n| n.edges.is_empty()))
            .collect();
        for key in &orphans {
            self.release_node(*key);
        }
        self.clean();
        debug!("culled {} orphaned node(s)", orphans.len());
        orphans.len()
    }

    /// Heal the store after elements were released.
    ///
    /// Edges left with a released endpoint are unlinked, released edges
    /// are dropped from adjacency lists, and index entries that no longer
    /// resolve to a live element are removed.
    ///
    /// Returns the number of index entries dropped.
    pub fn clean(&mut self) -> usize {
        let before = self.node_index.len() + self.edge_index.len();

        let dangling: Vec<EdgeKey> = self
            .edge_order
            .iter()
            .copied()
            .filter(|k| {
                self.edges.get(*k).is_some_and(|e| {
                    [e.start, e.end]
                        .into_iter()
                        .flatten()
                        .any(|n| !self.nodes.contains(n))
                })
            })
            .collect();
        for key in &dangling {
            self.unlink(*key);
        }
        if !dangling.is_empty() {
            warn!("unlinked {} edge(s) with a released endpoint", dangling.len());
        }

        let edges = &self.edges;
        for key in &self.node_order {
            if let Some(node) = self.nodes.get_mut(*key) {
                node.edges.retain(|k| edges.contains(*k));
            }
        }

        let nodes = &self.nodes;
        self.node_index
            .retain(|id, key| nodes.get(*key).is_some_and(|n| n.id == *id));
        let edges = &self.edges;
        self.edge_index
            .retain(|id, key| edges.get(*key).is_some_and(|e| e.id == *id));
        before - (self.node_index.len() + self.edge_index.len())
    }

    /// Number of index entries that no longer resolve.
    pub fn stale_index_entries(&self) -> usize {
        let nodes = self
            .node_index
            .iter()
            .filter(|(id, key)| !self.nodes.get(**key).is_some_and(|n| n.id == **id))
            .count();
        let edges = self
            .edge_index
            .iter()
            .filter(|(id, key)| !self.edges.get(**key).is_some_and(|e| e.id == **id))
            .count();
        nodes + edges
    }

    /// Drop a node from storage without unlinking it or touching the index.
    ///
    /// Edges that referenced the node keep a dangling endpoint and the id
    /// index keeps a stale entry until [`Network::clean`] runs, which
    /// unlinks those edges.
    pub fn release_node(&mut self, key: NodeKey) -> Option<Node> {
        let node = self.nodes.remove(key)?;
        self.node_order.retain(|k| *k != key);
        Some(node)
    }

    /// Drop an edge from storage without unlinking it or touching the index.
    pub fn release_edge(&mut self, key: EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        self.edge_order.retain(|k| *k != key);
        Some(edge)
    }

    /// Set a parent/child relation on both sides.
    ///
    /// Returns `false` if either handle is stale.
    pub fn adopt(&mut self, parent: ElementRef, child: ElementRef) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            return false;
        }
        match child {
            ElementRef::Node(k) => {
                if let Some(n) = self.nodes.get_mut(k) {
                    n.parent = Some(parent);
                }
            }
            ElementRef::Edge(k) => {
                if let Some(e) = self.edges.get_mut(k) {
                    e.parent = Some(parent);
                }
            }
        }
        let children = match parent {
            ElementRef::Node(k) => self.nodes.get_mut(k).map(|n| &mut n.children),
            ElementRef::Edge(k) => self.edges.get_mut(k).map(|e| &mut e.children),
        };
        if let Some(children) = children {
            if !children.contains(&child) {
                children.push(child);
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------------

    /// Copy the network, keeping every id.
    ///
    /// Adjacency is rebuilt by relinking; attributes are cloned and
    /// parent/child relations are remapped onto the copy.
    pub fn duplicate(&self) -> Network {
        self.copy(false)
    }

    /// Copy the network, giving every node and edge a fresh id.
    pub fn duplicate_fresh(&self) -> Network {
        self.copy(true)
    }

    fn copy(&self, fresh: bool) -> Network {
        let mut copy = Network::new(self.name.clone());
        copy.version = self.version;

        let new_id = |id: Id| if fresh { Id::new() } else { id };
        let mut node_ids: HashMap<Id, Id> = HashMap::new();
        let mut node_map: HashMap<NodeKey, NodeKey> = HashMap::new();
        let mut edge_map: HashMap<EdgeKey, EdgeKey> = HashMap::new();

        for (key, node) in self.nodes() {
            let id = new_id(node.id);
            node_ids.insert(node.id, id);
            node_map.insert(key, copy.add_node(node.detached(id)));
        }

        for (key, edge) in self.edges() {
            let ends = edge
                .endpoints()
                .and_then(|(s, e)| Some((*node_map.get(&s)?, *node_map.get(&e)?)));
            let Some((start, end)) = ends else {
                warn!("skipping edge {} with a missing endpoint", edge.id);
                continue;
            };
            match copy.link_edge(start, end, edge.detached(new_id(edge.id))) {
                Ok(new_key) => {
                    edge_map.insert(key, new_key);
                }
                Err(e) => warn!("skipping edge {}: {e}", edge.id),
            }
        }

        let remap = |r: ElementRef| match r {
            ElementRef::Node(k) => node_map.get(&k).map(|k| ElementRef::Node(*k)),
            ElementRef::Edge(k) => edge_map.get(&k).map(|k| ElementRef::Edge(*k)),
        };
        for (old, new) in &node_map {
            let (Some(src), Some(dst)) = (self.nodes.get(*old), copy.nodes.get_mut(*new)) else {
                continue;
            };
            dst.parent = src.parent.and_then(remap);
            dst.children = src.children.iter().filter_map(|r| remap(*r)).collect();
        }
        for (old, new) in &edge_map {
            let (Some(src), Some(dst)) = (self.edges.get(*old), copy.edges.get_mut(*new)) else {
                continue;
            };
            dst.parent = src.parent.and_then(remap);
            dst.children = src.children.iter().filter_map(|r| remap(*r)).collect();
        }

        copy.groups = self
            .groups
            .iter()
            .map(|g| g.remapped(|id| node_ids.get(&id).copied().unwrap_or(id)))
            .collect();
        copy
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn edge_mut(&mut self, key: EdgeKey) -> Option<&mut Edge> {
        self.edges.get_mut(key)
    }

    /// Handle of the live node with this id.
    pub fn node_key(&self, id: Id) -> Option<NodeKey> {
        let key = *self.node_index.get(&id)?;
        self.nodes.get(key).filter(|n| n.id == id).map(|_| key)
    }

    /// Handle of the live edge with this id.
    pub fn edge_key(&self, id: Id) -> Option<EdgeKey> {
        let key = *self.edge_index.get(&id)?;
        self.edges.get(key).filter(|e| e.id == id).map(|_| key)
    }

    pub fn get_node(&self, id: Id) -> Option<&Node> {
        self.node_key(id).and_then(|k| self.nodes.get(k))
    }

    pub fn get_edge(&self, id: Id) -> Option<&Edge> {
        self.edge_key(id).and_then(|k| self.edges.get(k))
    }

    /// Resolve an id to whichever kind of element carries it.
    pub fn get_element(&self, id: Id) -> Option<ElementRef> {
        self.node_key(id)
            .map(ElementRef::Node)
            .or_else(|| self.edge_key(id).map(ElementRef::Edge))
    }

    /// Id of a referenced element, if it is live.
    pub fn element_id(&self, element: ElementRef) -> Option<Id> {
        match element {
            ElementRef::Node(k) => self.nodes.get(k).map(|n| n.id),
            ElementRef::Edge(k) => self.edges.get(k).map(|e| e.id),
        }
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        match element {
            ElementRef::Node(k) => self.nodes.contains(k),
            ElementRef::Edge(k) => self.edges.contains(k),
        }
    }

    /// The node on the far side of the `index`-th edge of `node`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the node is stale or `index` is out of
    /// range; [`Error::InvalidData`] if the edge has lost its far endpoint.
    pub fn connected_node(&self, node: NodeKey, index: usize) -> Result<NodeKey> {
        let n = self
            .nodes
            .get(node)
            .ok_or_else(|| Error::invalid_input("node is null"))?;
        let edge_key = *n.edges.get(index).ok_or_else(|| {
            Error::invalid_input(format!(
                "edge index {index} out of range for node with valence {}",
                n.valence()
            ))
        })?;
        self.edges
            .get(edge_key)
            .and_then(|e| e.other(node))
            .filter(|k| self.nodes.contains(*k))
            .ok_or_else(|| {
                Error::invalid_data(format!("edge {index} of node {} is dangling", n.id))
            })
    }

    // ------------------------------------------------------------------------
    // Iteration and projections
    // ------------------------------------------------------------------------

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.node_order
            .iter()
            .filter_map(|k| self.nodes.get(*k).map(|n| (*k, n)))
    }

    /// Live edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &Edge)> {
        self.edge_order
            .iter()
            .filter_map(|k| self.edges.get(*k).map(|e| (*k, e)))
    }

    pub fn node_keys(&self) -> &[NodeKey] {
        &self.node_order
    }

    pub fn edge_keys(&self) -> &[EdgeKey] {
        &self.edge_order
    }

    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes().map(|(_, n)| n).collect()
    }

    pub fn all_edges(&self) -> Vec<&Edge> {
        self.edges().map(|(_, e)| e).collect()
    }

    /// Frames of all spatial nodes.
    pub fn nodes_as_frames(&self) -> Vec<Frame> {
        self.nodes().filter_map(|(_, n)| n.frame).collect()
    }

    /// Straight segments for every edge whose endpoints are both spatial.
    pub fn edges_as_lines(&self) -> Vec<Line> {
        self.edge_keys()
            .iter()
            .filter_map(|k| self.edge_line(*k))
            .collect()
    }

    /// Node ids keyed by insertion position.
    pub fn indexed_node_ids(&self) -> BTreeMap<usize, Id> {
        self.nodes().map(|(_, n)| n.id).enumerate().collect()
    }

    /// Edge ids keyed by insertion position.
    pub fn indexed_edge_ids(&self) -> BTreeMap<usize, Id> {
        self.edges().map(|(_, e)| e.id).enumerate().collect()
    }

    fn endpoint_frames(&self, key: EdgeKey) -> Option<(Frame, Frame)> {
        let (s, e) = self.edges.get(key)?.endpoints()?;
        Some((self.nodes.get(s)?.frame?, self.nodes.get(e)?.frame?))
    }

    /// Segment between the origins of an edge's endpoints.
    pub fn edge_line(&self, key: EdgeKey) -> Option<Line> {
        let (a, b) = self.endpoint_frames(key)?;
        Some(Line::new(a.origin(), b.origin()))
    }

    pub fn edge_midpoint(&self, key: EdgeKey) -> Option<DVec3> {
        self.edge_point_at(key, 0.5)
    }

    /// Point at parameter `t` along an edge (0 = start, 1 = end).
    pub fn edge_point_at(&self, key: EdgeKey, t: f64) -> Option<DVec3> {
        self.edge_line(key).map(|l| l.point_at(t))
    }

    /// Frame at parameter `t` along an edge.
    pub fn edge_frame_at(&self, key: EdgeKey, t: f64) -> Option<Frame> {
        let (a, b) = self.endpoint_frames(key)?;
        Some(Frame::interpolate(&a, &b, t))
    }

    pub fn edge_mid_frame(&self, key: EdgeKey) -> Option<Frame> {
        self.edge_frame_at(key, 0.5)
    }

    /// Re-orient every spatial node to a surface normal.
    ///
    /// `normal_at` is asked for the normal at each node origin; nodes for
    /// which it returns `None` are left alone. Returns the number of nodes
    /// re-oriented.
    pub fn orient_nodes<F>(&mut self, mut normal_at: F) -> usize
    where
        F: FnMut(DVec3) -> Option<DVec3>,
    {
        let mut changed = 0;
        for key in &self.node_order {
            let Some(frame) = self.nodes.get_mut(*key).and_then(|n| n.frame.as_mut()) else {
                continue;
            };
            if let Some(normal) = normal_at(frame.origin()) {
                if frame.orient_to_normal(normal) {
                    changed += 1;
                }
            }
        }
        changed
    }

    // ------------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------------

    /// Verify that every node and edge agree on their connections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] naming the first node whose adjacency and
    /// the edges' endpoints disagree.
    pub fn check_mutual(&self) -> Result<()> {
        match self.non_mutual_nodes().first() {
            Some(id) => Err(Error::corrupt(format!(
                "node {id}: edge/node relationship is not mutual"
            ))),
            None => Ok(()),
        }
    }

    /// Ids of nodes whose adjacency disagrees with the edges.
    pub fn non_mutual_nodes(&self) -> Vec<Id> {
        let mut bad = Vec::new();
        for (key, node) in self.nodes() {
            let claimed_ok = node
                .edges
                .iter()
                .all(|e| self.edges.get(*e).is_some_and(|edge| edge.touches(key)));
            let attached_ok = self
                .edges()
                .filter(|(_, e)| e.touches(key))
                .all(|(ek, _)| node.edges.contains(&ek));
            if !(claimed_ok && attached_ok) {
                bad.push(node.id);
            }
        }
        bad
    }

    /// Overwrite a node's adjacency list. Loader use only.
    pub(crate) fn set_adjacency(&mut self, key: NodeKey, edges: Vec<EdgeKey>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.edges = edges;
        }
    }

    /// Overwrite an edge's endpoints. Loader use only.
    pub(crate) fn set_endpoints(
        &mut self,
        key: EdgeKey,
        start: Option<NodeKey>,
        end: Option<NodeKey>,
    ) {
        if let Some(edge) = self.edges.get_mut(key) {
            edge.start = start;
            edge.end = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spatial(x: f64, y: f64) -> Node {
        Node::spatial(Frame::at(DVec3::new(x, y, 0.0)))
    }

    fn assert_mutual(net: &Network) {
        for (ek, edge) in net.edges() {
            let (s, e) = edge.endpoints().unwrap();
            assert!(net.node(s).unwrap().edges().contains(&ek));
            assert!(net.node(e).unwrap().edges().contains(&ek));
        }
        assert!(net.check_mutual().is_ok());
    }

    // ========================================================================
    // Insertion and linking
    // ========================================================================

    #[test]
    fn test_add_node_idempotent() {
        let mut net = Network::new("t");
        let node = Node::new();
        let id = node.id;
        let a = net.add_node(node);
        let b = net.add_node(Node::with_id(id).with_name("other"));
        assert_eq!(a, b);
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.get_node(id).unwrap().name, "");
    }

    #[test]
    fn test_link_updates_both_sides() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let e = net.link(a, b, None).unwrap();
        assert_eq!(net.node(a).unwrap().edges(), &[e]);
        assert_eq!(net.node(b).unwrap().edges(), &[e]);
        assert_eq!(net.edge(e).unwrap().endpoints(), Some((a, b)));
        assert_eq!(net.connected_node(a, 0).unwrap(), b);
        assert_eq!(net.connected_node(b, 0).unwrap(), a);
    }

    #[test]
    fn test_link_with_explicit_id() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let c = net.add_node(Node::new());
        let id = Id::new();
        let e = net.link(a, b, Some(id)).unwrap();
        assert_eq!(net.edge_key(id), Some(e));
        let err = net.link(b, c, Some(id)).unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(net.edge_count(), 1);
    }

    #[test]
    fn test_link_self_loop_rejected() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let err = net.link(a, a, None).unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(net.edge_count(), 0);
        assert_eq!(net.node(a).unwrap().valence(), 0);
    }

    #[test]
    fn test_link_stale_node_rejected() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        net.remove_node(b);
        assert!(net.link(a, b, None).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_link_ids_unknown() {
        let mut net = Network::new("t");
        let node = Node::new();
        let id = node.id;
        net.add_node(node);
        assert!(net.link_ids(id, Id::new(), None).is_err());
    }

    #[test]
    fn test_link_weighted() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let e = net.link_weighted(a, b, 3.0, None).unwrap();
        assert_eq!(net.edge(e).unwrap().kind, EdgeKind::Weighted(3.0));
    }

    #[test]
    fn test_connected_node_out_of_range() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        assert!(net.connected_node(a, 0).unwrap_err().is_invalid_input());
    }

    // ========================================================================
    // Removal
    // ========================================================================

    #[test]
    fn test_unlink() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let e = net.link(a, b, None).unwrap();
        let id = net.edge(e).unwrap().id;
        assert!(net.unlink(e).is_some());
        assert!(net.unlink(e).is_none());
        assert_eq!(net.edge_count(), 0);
        assert!(net.get_edge(id).is_none());
        assert_eq!(net.node(a).unwrap().valence(), 0);
        assert_eq!(net.node(b).unwrap().valence(), 0);
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut net = Network::new("t");
        let hub = net.add_node(Node::new());
        let leaves: Vec<NodeKey> = (0..3).map(|_| net.add_node(Node::new())).collect();
        for leaf in &leaves {
            net.link(hub, *leaf, None).unwrap();
        }
        let other = net.link(leaves[0], leaves[1], None).unwrap();

        net.remove_node(hub);
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 1);
        assert!(net.edges().all(|(_, e)| !e.touches(hub)));
        assert_eq!(net.node(leaves[2]).unwrap().valence(), 0);
        assert_eq!(net.node(leaves[0]).unwrap().edges(), &[other]);
        assert_mutual(&net);
    }

    #[test]
    fn test_remove_node_stale_is_noop() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        assert!(net.remove_node(a).is_some());
        assert!(net.remove_node(a).is_none());
        assert!(net.remove_node_id(Id::new()).is_none());
    }

    #[test]
    fn test_cull_orphaned_nodes() {
        let mut net = Network::new("t");
        let a = net.add_node(Node::new());
        let b = net.add_node(Node::new());
        let lonely = Node::new();
        let lonely_id = lonely.id;
        net.add_node(lonely);
        net.add_node(Node::new());
        net.link(a, b, None).unwrap();

        assert_eq!(net.cull_orphaned_nodes(), 2);
        assert_eq!(net.node_count(), 2);
        assert!(net.nodes().all(|(_, n)| n.valence() > 0));
        assert!(net.get_node(lonely_id).is_none());
        assert_eq!(net.stale_index_entries(), 0);
    }

    #[test]
    fn test_release_and_clean() {
        let mut net = Network::new("t");
        let node = Node::new();
        let id = node.id;
        let key = net.add_node(node);
        net.release_node(key);

        assert!(net.get_node(id).is_none());
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.stale_index_entries(), 1);
        assert_eq!(net.clean(), 1);
        assert_eq!(net.stale_index_entries(), 0);
        assert_eq!(net.clean(), 0);
    }

    #[test]
    fn test_clean_unlinks_edges_of_released_node() {
        let mut net = Network::new("t");
        let a = net.add_node(spatial(0.0, 0.0));
        let b = net.add_node(spatial(1.0, 0.0));
        let c = net.add_node(spatial(2.0, 0.0));
        net.link(a, b, None).unwrap();
        net.link(b, c, None).unwrap();

        net.release_node(c);
        assert_eq!(net.edge_count(), 2);
        assert_eq!(net.clean(), 2);

        assert_eq!(net.edge_count(), 1);
        assert_eq!(net.node(b).unwrap().valence(), 1);
        assert_eq!(net.stale_index_entries(), 0);
        assert_mutual(&net);

        let copy = net.deep_copy().unwrap();
        assert_eq!(copy.node_count(), 2);
        assert_eq!(copy.edge_count(), 1);
        assert_eq!(net.duplicate().edge_count(), 1);

        let xml = crate::persistence::to_document_string(&net).unwrap();
        let loaded = crate::persistence::load_document_from_str(&xml).unwrap();
        assert_eq!(loaded.edge_count(), 1);
        assert_mutual(&loaded);
    }

    #[test]
    fn test_clean_prunes_released_edge_from_adjacency() {
        let (mut net, [a, b, _]) = triangle();
        let e = net.node(a).unwrap().edges()[0];
        net.release_edge(e);
        assert_eq!(net.clean(), 1);
        assert_eq!(net.node(a).unwrap().valence(), 1);
        assert_eq!(net.node(b).unwrap().valence(), 1);
        assert_mutual(&net);
    }

    #[test]
    fn test_stale_index_does_not_alias_new_node() {
        let mut net = Network::new("t");
        let old = Node::new();
        let old_id = old.id;
        let key = net.add_node(old);
        net.release_node(key);
        let new_key = net.add_node(Node::new());
        assert!(net.get_node(old_id).is_none());
        assert!(net.node(new_key).is_some());
    }

    #[test]
    fn test_re_add_after_release() {
        let mut net = Network::new("t");
        let node = Node::new();
        let id = node.id;
        let key = net.add_node(node);
        net.release_node(key);
        let again = net.add_node(Node::with_id(id));
        assert_eq!(net.node_key(id), Some(again));
    }

    // ========================================================================
    // Copies and relations
    // ========================================================================

    fn triangle() -> (Network, [NodeKey; 3]) {
        let mut net = Network::new("tri");
        let a = net.add_node(spatial(0.0, 0.0));
        let b = net.add_node(spatial(1.0, 0.0));
        let c = net.add_node(spatial(0.0, 1.0));
        net.link(a, b, None).unwrap();
        net.link(b, c, None).unwrap();
        net.link_weighted(c, a, 2.0, None).unwrap();
        (net, [a, b, c])
    }

    #[test]
    fn test_duplicate_preserves_ids() {
        let (mut net, [a, b, _]) = triangle();
        net.adopt(ElementRef::Node(a), ElementRef::Node(b));
        let copy = net.duplicate();

        assert_eq!(copy.indexed_node_ids(), net.indexed_node_ids());
        assert_eq!(copy.indexed_edge_ids(), net.indexed_edge_ids());
        assert_mutual(&copy);

        let a_id = net.node(a).unwrap().id;
        let b_id = net.node(b).unwrap().id;
        let copy_b = copy.get_node(b_id).unwrap();
        let parent = copy_b.parent.unwrap();
        assert_eq!(copy.element_id(parent), Some(a_id));
        let weighted = copy
            .edges()
            .filter(|(_, e)| e.kind == EdgeKind::Weighted(2.0))
            .count();
        assert_eq!(weighted, 1);
    }

    #[test]
    fn test_duplicate_fresh_new_ids() {
        let (net, _) = triangle();
        let copy = net.duplicate_fresh();
        assert_eq!(copy.node_count(), 3);
        assert_eq!(copy.edge_count(), 3);
        for (_, node) in copy.nodes() {
            assert!(net.get_node(node.id).is_none());
        }
        assert_mutual(&copy);
        assert_eq!(copy.nodes_as_frames(), net.nodes_as_frames());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let (net, [a, _, _]) = triangle();
        let mut copy = net.duplicate();
        let a_id = net.node(a).unwrap().id;
        copy.remove_node_id(a_id);
        assert_eq!(net.node_count(), 3);
        assert_eq!(copy.node_count(), 2);
    }

    #[test]
    fn test_adopt() {
        let (mut net, [a, b, _]) = triangle();
        let e = net.node(a).unwrap().edges()[0];
        assert!(net.adopt(ElementRef::Node(a), ElementRef::Edge(e)));
        assert!(net.adopt(ElementRef::Node(a), ElementRef::Edge(e)));
        assert_eq!(net.node(a).unwrap().children, vec![ElementRef::Edge(e)]);
        assert_eq!(net.edge(e).unwrap().parent, Some(ElementRef::Node(a)));
        net.remove_node(b);
        assert!(!net.adopt(ElementRef::Node(b), ElementRef::Node(a)));
    }

    // ========================================================================
    // Projections
    // ========================================================================

    #[test]
    fn test_projections_skip_non_spatial() {
        let (mut net, [a, _, _]) = triangle();
        let abstract_node = net.add_node(Node::new());
        net.link(a, abstract_node, None).unwrap();
        assert_eq!(net.nodes_as_frames().len(), 3);
        assert_eq!(net.edges_as_lines().len(), 3);
        assert_eq!(net.indexed_node_ids().len(), 4);
        assert_eq!(net.indexed_edge_ids().len(), 4);
    }

    #[test]
    fn test_edge_geometry() {
        let (net, [a, b, _]) = triangle();
        let e = net.node(a).unwrap().edges()[0];
        assert_eq!(net.edge(e).unwrap().endpoints(), Some((a, b)));
        assert_eq!(net.edge_midpoint(e), Some(DVec3::new(0.5, 0.0, 0.0)));
        assert_eq!(net.edge_point_at(e, 1.0), Some(DVec3::X));
        let mid = net.edge_mid_frame(e).unwrap();
        assert!(mid.origin().abs_diff_eq(DVec3::new(0.5, 0.0, 0.0), 1e-12));
        assert!(mid.z_axis().abs_diff_eq(DVec3::Z, 1e-12));
    }

    #[test]
    fn test_orient_nodes() {
        let (mut net, _) = triangle();
        let abstract_node = net.add_node(Node::new());
        let changed = net.orient_nodes(|p| if p.x > 0.5 { Some(DVec3::X) } else { None });
        assert_eq!(changed, 1);
        let oriented = net
            .nodes()
            .filter(|(_, n)| n.frame.is_some_and(|f| f.z_axis().abs_diff_eq(DVec3::X, 1e-9)))
            .count();
        assert_eq!(oriented, 1);
        assert!(net.node(abstract_node).unwrap().frame.is_none());
    }

    #[test]
    fn test_get_element() {
        let (net, [a, _, _]) = triangle();
        let node_id = net.node(a).unwrap().id;
        let edge_key = net.node(a).unwrap().edges()[0];
        let edge_id = net.edge(edge_key).unwrap().id;
        assert_eq!(net.get_element(node_id), Some(ElementRef::Node(a)));
        assert_eq!(net.get_element(edge_id), Some(ElementRef::Edge(edge_key)));
        assert_eq!(net.get_element(Id::new()), None);
    }

    #[test]
    fn test_groups() {
        let (mut net, [a, b, _]) = triangle();
        let ids = vec![net.node(a).unwrap().id, net.node(b).unwrap().id];
        net.add_group(NodeGroup::new("pair", ids));
        assert_eq!(net.group("pair").unwrap().nodes.len(), 2);
        assert!(net.group("missing").is_none());
    }

    // ========================================================================
    // Mutual-reference invariant
    // ========================================================================

    #[derive(Clone, Debug)]
    enum Op {
        Link(usize, usize),
        Unlink(usize),
        Remove(usize),
        ReleaseAndClean(usize),
        Add,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0usize..16, 0usize..16).prop_map(|(a, b)| Op::Link(a, b)),
            2 => (0usize..32).prop_map(Op::Unlink),
            1 => (0usize..16).prop_map(Op::Remove),
            1 => (0usize..16).prop_map(Op::ReleaseAndClean),
            1 => Just(Op::Add),
        ]
    }

    proptest! {
        #[test]
        fn prop_adjacency_stays_mutual(ops in proptest::collection::vec(op(), 0..80)) {
            let mut net = Network::new("prop");
            for _ in 0..8 {
                net.add_node(Node::new());
            }
            for op in ops {
                let nodes = net.node_keys().to_vec();
                let edges = net.edge_keys().to_vec();
                match op {
                    Op::Link(a, b) if !nodes.is_empty() => {
                        let (ka, kb) = (nodes[a % nodes.len()], nodes[b % nodes.len()]);
                        let before = net.edge_count();
                        let linked = net.link(ka, kb, None);
                        prop_assert_eq!(linked.is_err(), ka == kb);
                        if ka == kb {
                            prop_assert_eq!(net.edge_count(), before);
                        }
                    }
                    Op::Unlink(i) if !edges.is_empty() => {
                        net.unlink(edges[i % edges.len()]);
                    }
                    Op::Remove(i) if !nodes.is_empty() => {
                        let key = nodes[i % nodes.len()];
                        net.remove_node(key);
                        prop_assert!(net.edges().all(|(_, e)| !e.touches(key)));
                    }
                    Op::ReleaseAndClean(i) if !nodes.is_empty() => {
                        net.release_node(nodes[i % nodes.len()]);
                        net.clean();
                        prop_assert_eq!(net.stale_index_entries(), 0);
                    }
                    Op::Add => {
                        net.add_node(Node::new());
                    }
                    _ => {}
                }
                for (ek, edge) in net.edges() {
                    let (s, e) = edge.endpoints().unwrap();
                    prop_assert!(net.node(s).unwrap().edges().contains(&ek));
                    prop_assert!(net.node(e).unwrap().edges().contains(&ek));
                }
                prop_assert!(net.check_mutual().is_ok());
            }
        }
    }
}
