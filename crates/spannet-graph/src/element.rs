//! Node and edge records stored in a [`Network`](crate::Network).
//!
//! Elements never own each other. A node's adjacency list and an edge's
//! endpoints are handles into the owning network's arenas; the network is
//! the only place they are rewired, which keeps the two sides mutual.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde_json::Value;
use spannet_core::{Frame, Id};

use crate::arena::arena_key;

arena_key!(
    /// Handle to a node inside a [`Network`](crate::Network).
    NodeKey
);

arena_key!(
    /// Handle to an edge inside a [`Network`](crate::Network).
    EdgeKey
);

/// Free-form data attached to nodes, edges and groups.
pub type Attributes = HashMap<String, Value>;

/// Type tag written for nodes without a frame.
pub const NODE_TYPE: &str = "Node";
/// Type tag written for nodes with a frame.
pub const SPACE_NODE_TYPE: &str = "SpaceNode";
/// Type tag written for plain edges.
pub const EDGE_TYPE: &str = "Edge";
/// Type tag written for weighted edges.
pub const WEIGHTED_EDGE_TYPE: &str = "WeightedEdge";

// ============================================================================
// ElementRef
// ============================================================================

/// Reference to either kind of element, used for parent/child links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Node(NodeKey),
    Edge(EdgeKey),
}

impl From<NodeKey> for ElementRef {
    fn from(key: NodeKey) -> Self {
        Self::Node(key)
    }
}

impl From<EdgeKey> for ElementRef {
    fn from(key: EdgeKey) -> Self {
        Self::Edge(key)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A vertex of the network.
#[derive(Clone, Debug)]
pub struct Node {
    /// Stable identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Position and orientation, when the node is spatial.
    pub frame: Option<Frame>,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Attached data.
    pub attributes: Attributes,
    /// Owning element, if any.
    pub parent: Option<ElementRef>,
    /// Owned elements.
    pub children: Vec<ElementRef>,
    pub(crate) edges: Vec<EdgeKey>,
}

impl Node {
    /// Create an abstract node with a fresh id.
    pub fn new() -> Self {
        Self::with_id(Id::new())
    }

    /// Create an abstract node with the given id.
    pub fn with_id(id: Id) -> Self {
        Self {
            id,
            name: String::new(),
            frame: None,
            tags: Vec::new(),
            attributes: Attributes::new(),
            parent: None,
            children: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Create a spatial node with a fresh id.
    pub fn spatial(frame: Frame) -> Self {
        Self::new().with_frame(frame)
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Incident edges, in the order they were linked.
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    /// Number of incident edges.
    pub fn valence(&self) -> usize {
        self.edges.len()
    }

    /// True when the node carries a frame.
    pub fn is_spatial(&self) -> bool {
        self.frame.is_some()
    }

    /// Type tag used by the document format.
    pub fn type_tag(&self) -> &'static str {
        if self.is_spatial() {
            SPACE_NODE_TYPE
        } else {
            NODE_TYPE
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Copy of this node without adjacency or relations.
    pub(crate) fn detached(&self, id: Id) -> Self {
        Self {
            id,
            name: self.name.clone(),
            frame: self.frame,
            tags: self.tags.clone(),
            attributes: self.attributes.clone(),
            parent: None,
            children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Edge
// ============================================================================

/// Edge variant.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum EdgeKind {
    #[default]
    Plain,
    Weighted(f64),
}

impl EdgeKind {
    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::Plain => None,
            Self::Weighted(w) => Some(*w),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Plain => EDGE_TYPE,
            Self::Weighted(_) => WEIGHTED_EDGE_TYPE,
        }
    }
}

/// A connection between two nodes.
///
/// Endpoints are optional only while an edge is being materialised by a
/// loader or after its owner dropped one of the nodes; edges created with
/// [`Network::link`](crate::Network::link) always have both.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Stable identifier.
    pub id: Id,
    pub kind: EdgeKind,
    /// Attached data.
    pub attributes: Attributes,
    /// Data belonging to the start end of the edge.
    pub start_data: Option<Value>,
    /// Data belonging to the end end of the edge.
    pub end_data: Option<Value>,
    /// Owning element, if any.
    pub parent: Option<ElementRef>,
    /// Owned elements.
    pub children: Vec<ElementRef>,
    pub(crate) start: Option<NodeKey>,
    pub(crate) end: Option<NodeKey>,
}

impl Edge {
    /// Create an unattached edge with a fresh id.
    pub fn new() -> Self {
        Self::with_id(Id::new())
    }

    /// Create an unattached edge with the given id.
    pub fn with_id(id: Id) -> Self {
        Self {
            id,
            kind: EdgeKind::Plain,
            attributes: Attributes::new(),
            start_data: None,
            end_data: None,
            parent: None,
            children: Vec::new(),
            start: None,
            end: None,
        }
    }

    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn start(&self) -> Option<NodeKey> {
        self.start
    }

    pub fn end(&self) -> Option<NodeKey> {
        self.end
    }

    /// Both endpoints, if both are set.
    pub fn endpoints(&self) -> Option<(NodeKey, NodeKey)> {
        Some((self.start?, self.end?))
    }

    /// True when `node` is one of the endpoints.
    pub fn touches(&self, node: NodeKey) -> bool {
        self.start == Some(node) || self.end == Some(node)
    }

    /// The endpoint opposite `node`.
    pub fn other(&self, node: NodeKey) -> Option<NodeKey> {
        if self.start == Some(node) {
            self.end
        } else if self.end == Some(node) {
            self.start
        } else {
            None
        }
    }

    pub fn weight(&self) -> Option<f64> {
        self.kind.weight()
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub(crate) fn detached(&self, id: Id) -> Self {
        Self {
            id,
            kind: self.kind,
            attributes: self.attributes.clone(),
            start_data: self.start_data.clone(),
            end_data: self.end_data.clone(),
            parent: None,
            children: Vec::new(),
            start: None,
            end: None,
        }
    }

    fn unordered_endpoints(&self) -> Option<(NodeKey, NodeKey)> {
        let (a, b) = self.endpoints()?;
        Some(if a <= b { (a, b) } else { (b, a) })
    }
}

impl Default for Edge {
    fn default() -> Self {
        Self::new()
    }
}

/// Edges are equal when they share an id or join the same pair of nodes.
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        if self.id == other.id {
            return true;
        }
        match (self.unordered_endpoints(), other.unordered_endpoints()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
