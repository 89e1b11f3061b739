//! Flat, id-resolved record format.
//!
//! Every reference (adjacency, endpoints, parent, children) is written as a
//! plain [`Id`]. Loading happens in two passes: first every node and edge is
//! materialised and registered, then every reference is resolved against
//! the registered set. This is also how [`Network::deep_copy`] works, so a
//! deep copy keeps parent/child relations.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spannet_core::util::paths::ensure_parent_dir;
use spannet_core::{Error, Frame, Id, Result};

use crate::element::{Attributes, Edge, EdgeKind, ElementRef, Node};
use crate::group::NodeGroup;
use crate::network::{NETWORK_VERSION, Network};

// ============================================================================
// Record types
// ============================================================================

/// A whole network as flat records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecords {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<NodeGroup>,
}

fn default_version() -> u32 {
    NETWORK_VERSION
}

/// One node with its references as ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(default)]
    pub edges: Vec<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Id>,
}

/// One edge with its references as ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: Id,
    pub start: Option<Id>,
    pub end: Option<Id>,
    /// Present only for weighted edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Id>,
}

// ============================================================================
// Conversion
// ============================================================================

impl Network {
    /// Flatten the network into id-resolved records.
    pub fn to_records(&self) -> NetworkRecords {
        let ids = |refs: &[ElementRef]| -> Vec<Id> {
            refs.iter().filter_map(|r| self.element_id(*r)).collect()
        };

        let nodes = self
            .nodes()
            .map(|(_, node)| NodeRecord {
                id: node.id,
                name: node.name.clone(),
                frame: node.frame,
                edges: node
                    .edges()
                    .iter()
                    .filter_map(|k| self.edge(*k).map(|e| e.id))
                    .collect(),
                tags: node.tags.clone(),
                attributes: node.attributes.clone(),
                parent: node.parent.and_then(|p| self.element_id(p)),
                children: ids(&node.children),
            })
            .collect();

        let edges = self
            .edges()
            .map(|(_, edge)| EdgeRecord {
                id: edge.id,
                start: edge.start().and_then(|k| self.node(k)).map(|n| n.id),
                end: edge.end().and_then(|k| self.node(k)).map(|n| n.id),
                weight: edge.weight(),
                attributes: edge.attributes.clone(),
                start_data: edge.start_data.clone(),
                end_data: edge.end_data.clone(),
                parent: edge.parent.and_then(|p| self.element_id(p)),
                children: ids(&edge.children),
            })
            .collect();

        NetworkRecords {
            name: self.name.clone(),
            version: self.version,
            nodes,
            edges,
            groups: self.groups.clone(),
        }
    }

    /// Rebuild a network from records.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] if an id is duplicated, a reference does not
    /// resolve, an edge lacks an endpoint or joins a node to itself, or the
    /// adjacency lists disagree with the edge endpoints.
    pub fn from_records(records: NetworkRecords) -> Result<Network> {
        let mut network = Network::new(records.name);
        network.version = records.version;

        // Pass 1: materialise.
        let mut seen: HashSet<Id> = HashSet::new();
        for record in &records.nodes {
            if !seen.insert(record.id) {
                return Err(Error::corrupt(format!("duplicate id {}", record.id)));
            }
            let mut node = Node::with_id(record.id).with_name(record.name.clone());
            node.frame = record.frame;
            node.tags = record.tags.clone();
            node.attributes = record.attributes.clone();
            network.add_node(node);
        }
        for record in &records.edges {
            if !seen.insert(record.id) {
                return Err(Error::corrupt(format!("duplicate id {}", record.id)));
            }
            let mut edge = Edge::with_id(record.id);
            edge.kind = record.weight.map_or(EdgeKind::Plain, EdgeKind::Weighted);
            edge.attributes = record.attributes.clone();
            edge.start_data = record.start_data.clone();
            edge.end_data = record.end_data.clone();
            network.add_edge(edge);
        }
        debug!(
            "materialised {} node(s) and {} edge(s)",
            records.nodes.len(),
            records.edges.len()
        );

        // Pass 2: resolve references.
        for record in &records.nodes {
            let key = network
                .node_key(record.id)
                .ok_or_else(|| unresolved(record.id, record.id))?;
            let adjacency = record
                .edges
                .iter()
                .map(|id| network.edge_key(*id).ok_or_else(|| unresolved(record.id, *id)))
                .collect::<Result<Vec<_>>>()?;
            let (parent, children) =
                resolve_relations(&network, record.id, record.parent, &record.children)?;
            network.set_adjacency(key, adjacency);
            if let Some(node) = network.node_mut(key) {
                node.parent = parent;
                node.children = children;
            }
        }
        for record in &records.edges {
            let key = network
                .edge_key(record.id)
                .ok_or_else(|| unresolved(record.id, record.id))?;
            let endpoint = |id: Option<Id>, which: &str| -> Result<_> {
                let id = id.ok_or_else(|| {
                    Error::corrupt(format!("edge {} has no {which} node", record.id))
                })?;
                network.node_key(id).ok_or_else(|| unresolved(record.id, id))
            };
            let start = endpoint(record.start, "start")?;
            let end = endpoint(record.end, "end")?;
            if start == end {
                return Err(Error::corrupt(format!(
                    "edge {} links a node to itself",
                    record.id
                )));
            }
            let (parent, children) =
                resolve_relations(&network, record.id, record.parent, &record.children)?;
            network.set_endpoints(key, Some(start), Some(end));
            if let Some(edge) = network.edge_mut(key) {
                edge.parent = parent;
                edge.children = children;
            }
        }

        network.check_mutual()?;
        network.groups = records.groups;
        debug!(
            "loaded network '{}' from records: {} nodes, {} edges",
            network.name,
            network.node_count(),
            network.edge_count()
        );
        Ok(network)
    }

    /// Copy the network through its record form.
    pub fn deep_copy(&self) -> Result<Network> {
        Network::from_records(self.to_records())
    }
}

fn unresolved(owner: Id, id: Id) -> Error {
    Error::corrupt(format!("{owner}: reference {id} does not resolve"))
}

fn resolve_relations(
    network: &Network,
    owner: Id,
    parent: Option<Id>,
    children: &[Id],
) -> Result<(Option<ElementRef>, Vec<ElementRef>)> {
    let parent = parent
        .map(|id| network.get_element(id).ok_or_else(|| unresolved(owner, id)))
        .transpose()?;
    let children = children
        .iter()
        .map(|id| network.get_element(*id).ok_or_else(|| unresolved(owner, *id)))
        .collect::<Result<Vec<_>>>()?;
    Ok((parent, children))
}

// ============================================================================
// JSON I/O
// ============================================================================

/// Render records as pretty-printed JSON.
pub fn records_to_json(records: &NetworkRecords) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| Error::serialization(format!("Failed to serialize records: {e}")))
}

/// Save a network as JSON records.
pub fn save_records(network: &Network, path: impl AsRef<Path>, create_dir: bool) -> Result<()> {
    let path = path.as_ref();
    let json = records_to_json(&network.to_records())?;
    ensure_parent_dir(path, create_dir)?;
    std::fs::write(path, json).map_err(|e| Error::io_with_path(e, path))?;
    debug!("saved records for '{}' to {}", network.name, path.display());
    Ok(())
}

/// Load a network from a JSON records file.
pub fn load_records(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::not_found(format!(
            "records file {} does not exist",
            path.display()
        )));
    }
    let json = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    load_records_from_str(&json)
}

/// Load a network from a JSON string.
pub fn load_records_from_str(json: &str) -> Result<Network> {
    let records: NetworkRecords = serde_json::from_str(json)
        .map_err(|e| Error::parse(format!("Failed to parse records JSON: {e}")))?;
    Network::from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Network {
        let mut net = Network::new("sample");
        let a = net.add_node(
            Node::spatial(Frame::at(DVec3::ZERO))
                .with_name("a")
                .with_tag("foot_node")
                .with_attribute("load", 1.5),
        );
        let b = net.add_node(Node::spatial(Frame::at(DVec3::X)).with_name("b"));
        let c = net.add_node(Node::new().with_name("c"));
        let ab = net.link(a, b, None).unwrap();
        net.link_weighted(b, c, 4.0, None).unwrap();
        if let Some(edge) = net.edge_mut(ab) {
            edge.start_data = Some(json!({"offset": 2}));
            edge.attributes.insert("layer".into(), json!("top"));
        }
        net.adopt(ElementRef::Node(a), ElementRef::Node(c));
        net.adopt(ElementRef::Edge(ab), ElementRef::Node(b));
        net
    }

    #[test]
    fn test_records_round_trip() {
        let net = sample();
        let records = net.to_records();
        assert_eq!(records.nodes.len(), 3);
        assert_eq!(records.edges.len(), 2);

        let loaded = Network::from_records(records.clone()).unwrap();
        assert_eq!(loaded.to_records(), records);
    }

    #[test]
    fn test_deep_copy_keeps_relations() {
        let net = sample();
        let copy = net.deep_copy().unwrap();
        let a = copy.nodes().find(|(_, n)| n.name == "a").unwrap().1;
        let c = copy.nodes().find(|(_, n)| n.name == "c").unwrap().1;
        assert_eq!(copy.element_id(c.parent.unwrap()), Some(a.id));
        assert_eq!(a.children.len(), 1);
        assert!(a.has_tag("foot_node"));
        assert_eq!(a.attributes["load"], json!(1.5));
        assert!(copy.check_mutual().is_ok());
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        let net = sample();
        save_records(&net, &path, false).unwrap();
        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.indexed_node_ids(), net.indexed_node_ids());
        assert_eq!(loaded.indexed_edge_ids(), net.indexed_edge_ids());
        let weighted = loaded.edges().find(|(_, e)| e.weight().is_some()).unwrap().1;
        assert_eq!(weighted.kind, EdgeKind::Weighted(4.0));
    }

    #[test]
    fn test_unresolved_reference_is_corrupt() {
        let mut records = sample().to_records();
        records.nodes[0].edges.push(Id::new());
        assert!(Network::from_records(records).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_duplicate_id_is_corrupt() {
        let mut records = sample().to_records();
        let dup = records.nodes[0].clone();
        records.nodes.push(dup);
        assert!(Network::from_records(records).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_non_mutual_records_are_corrupt() {
        let mut records = sample().to_records();
        records.nodes[0].edges.clear();
        let err = Network::from_records(records).unwrap_err();
        assert!(err.is_corrupt());
        assert!(err.to_string().contains("not mutual"));
    }

    #[test]
    fn test_missing_endpoint_is_corrupt() {
        let mut records = sample().to_records();
        records.edges[0].end = None;
        assert!(Network::from_records(records).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = load_records_from_str("{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
