//! Structured XML document format.
//!
//! ```xml
//! <network version="4" name="...">
//!   <nodes count="2">
//!     <node type="SpaceNode" id="..." name="...">
//!       <edge id="..."/>
//!       <frame PosX="0" PosY="0" PosZ="0" XX="1" XY="0" XZ="0" YX="0" YY="1" YZ="0"/>
//!     </node>
//!   </nodes>
//!   <edges count="1">
//!     <edge type="Edge" id="..." end1="..." end2="..."/>
//!   </edges>
//! </network>
//! ```
//!
//! Each node lists the ids of the edges it believes it is attached to.
//! Loading relinks edges from their `end1`/`end2` attributes and then
//! checks the two views agree; any disagreement rejects the whole file.

use std::collections::HashSet;
use std::path::Path;

use glam::DVec3;
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use spannet_core::util::paths::ensure_parent_dir;
use spannet_core::{Error, Frame, Id, Result};

use crate::element::{
    EDGE_TYPE, Edge, EdgeKind, NODE_TYPE, Node, SPACE_NODE_TYPE, WEIGHTED_EDGE_TYPE,
};
use crate::network::{NETWORK_VERSION, Network};

/// Root element name.
pub const ROOT_ELEMENT: &str = "network";

// ============================================================================
// Document shapes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct NetworkDoc {
    #[serde(rename = "@version", default = "default_version")]
    version: u32,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(default)]
    nodes: Option<NodesDoc>,
    #[serde(default)]
    edges: Option<EdgesDoc>,
}

fn default_version() -> u32 {
    NETWORK_VERSION
}

#[derive(Debug, Serialize, Deserialize)]
struct NodesDoc {
    #[serde(rename = "@count", default)]
    count: usize,
    #[serde(rename = "node", default)]
    nodes: Vec<NodeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeDoc {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "edge", default)]
    edges: Vec<EdgeRefDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frame: Option<FrameDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRefDoc {
    #[serde(rename = "@id")]
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgesDoc {
    #[serde(rename = "@count", default)]
    count: usize,
    #[serde(rename = "edge", default)]
    edges: Vec<EdgeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeDoc {
    #[serde(rename = "@type", default = "default_edge_type")]
    kind: String,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@end1")]
    end1: String,
    #[serde(rename = "@end2")]
    end2: String,
    #[serde(rename = "@weight", default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

fn default_edge_type() -> String {
    EDGE_TYPE.to_string()
}

/// Frame as nine attributes: origin, X axis, Y axis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FrameDoc {
    #[serde(rename = "@PosX")]
    pos_x: f64,
    #[serde(rename = "@PosY")]
    pos_y: f64,
    #[serde(rename = "@PosZ")]
    pos_z: f64,
    #[serde(rename = "@XX")]
    xx: f64,
    #[serde(rename = "@XY")]
    xy: f64,
    #[serde(rename = "@XZ")]
    xz: f64,
    #[serde(rename = "@YX")]
    yx: f64,
    #[serde(rename = "@YY")]
    yy: f64,
    #[serde(rename = "@YZ")]
    yz: f64,
}

impl From<&Frame> for FrameDoc {
    fn from(frame: &Frame) -> Self {
        let (o, x, y) = (frame.origin(), frame.x_axis(), frame.y_axis());
        Self {
            pos_x: o.x,
            pos_y: o.y,
            pos_z: o.z,
            xx: x.x,
            xy: x.y,
            xz: x.z,
            yx: y.x,
            yy: y.y,
            yz: y.z,
        }
    }
}

impl FrameDoc {
    pub fn to_frame(self) -> Option<Frame> {
        Frame::new(
            DVec3::new(self.pos_x, self.pos_y, self.pos_z),
            DVec3::new(self.xx, self.xy, self.xz),
            DVec3::new(self.yx, self.yy, self.yz),
        )
    }
}

// ============================================================================
// Write
// ============================================================================

/// Render a network as an XML document.
pub fn to_document_string(network: &Network) -> Result<String> {
    let nodes: Vec<NodeDoc> = network
        .nodes()
        .map(|(_, node)| NodeDoc {
            kind: node.type_tag().to_string(),
            id: node.id.to_string(),
            name: node.name.clone(),
            edges: node
                .edges()
                .iter()
                .filter_map(|k| network.edge(*k))
                .map(|e| EdgeRefDoc {
                    id: e.id.to_string(),
                })
                .collect(),
            frame: node.frame.as_ref().map(FrameDoc::from),
        })
        .collect();

    let mut edges = Vec::with_capacity(network.edge_count());
    for (_, edge) in network.edges() {
        let ends = edge
            .endpoints()
            .and_then(|(s, e)| Some((network.node(s)?.id, network.node(e)?.id)));
        let Some((start, end)) = ends else {
            return Err(Error::invalid_data(format!(
                "edge {} has a missing endpoint",
                edge.id
            )));
        };
        edges.push(EdgeDoc {
            kind: edge.type_tag().to_string(),
            id: edge.id.to_string(),
            end1: start.to_string(),
            end2: end.to_string(),
            weight: edge.weight(),
        });
    }

    let doc = NetworkDoc {
        version: network.version,
        name: network.name.clone(),
        nodes: Some(NodesDoc {
            count: nodes.len(),
            nodes,
        }),
        edges: Some(EdgesDoc {
            count: edges.len(),
            edges,
        }),
    };

    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut body, Some(ROOT_ELEMENT))
        .map_err(|e| Error::serialization(format!("Failed to serialize network: {e}")))?;
    ser.indent(' ', 2);
    doc.serialize(ser)
        .map_err(|e| Error::serialization(format!("Failed to serialize network: {e}")))?;

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}\n"
    ))
}

/// Write a network document to `path`.
///
/// The parent directory must exist unless `create_dir` is set.
pub fn save_document(network: &Network, path: impl AsRef<Path>, create_dir: bool) -> Result<()> {
    let path = path.as_ref();
    let xml = to_document_string(network)?;
    ensure_parent_dir(path, create_dir)?;
    std::fs::write(path, xml).map_err(|e| Error::io_with_path(e, path))?;
    debug!("saved network '{}' to {}", network.name, path.display());
    Ok(())
}

// ============================================================================
// Read
// ============================================================================

/// Load a network document from `path`.
pub fn load_document(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::not_found(format!(
            "network file {} does not exist",
            path.display()
        )));
    }
    let xml = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    load_document_from_str(&xml)
}

/// Parse a network document.
///
/// The result is all or nothing: any structural problem fails the load
/// without returning a partial network.
pub fn load_document_from_str(xml: &str) -> Result<Network> {
    let root = root_element(xml)?;
    if root != ROOT_ELEMENT {
        return Err(Error::corrupt(format!(
            "root element is '{root}', expected '{ROOT_ELEMENT}'"
        )));
    }

    let doc: NetworkDoc = quick_xml::de::from_str(xml)
        .map_err(|e| Error::parse(format!("Failed to parse network document: {e}")))?;
    let nodes = doc
        .nodes
        .ok_or_else(|| Error::corrupt("document has no 'nodes' element"))?;
    let edges = doc
        .edges
        .ok_or_else(|| Error::corrupt("document has no 'edges' element"))?;
    if edges.edges.is_empty() {
        return Err(Error::corrupt("document contains no edges"));
    }

    let mut network = Network::new(doc.name);
    network.version = doc.version;

    debug!("reading {} node(s)", nodes.nodes.len());
    let mut claimed: Vec<(Id, HashSet<Id>)> = Vec::with_capacity(nodes.nodes.len());
    for node_doc in nodes.nodes {
        let id = Id::parse_for(&node_doc.id, "node id")?;
        if network.node_key(id).is_some() {
            return Err(Error::corrupt(format!("duplicate node id {id}")));
        }
        let frame = match node_doc.kind.as_str() {
            SPACE_NODE_TYPE => {
                let frame_doc = node_doc.frame.ok_or_else(|| {
                    Error::corrupt(format!("space node {id} has no frame element"))
                })?;
                Some(frame_doc.to_frame().ok_or_else(|| {
                    Error::corrupt(format!("space node {id} has a degenerate frame"))
                })?)
            }
            NODE_TYPE => None,
            other => {
                return Err(Error::corrupt(format!(
                    "node {id} has unknown type '{other}'"
                )));
            }
        };

        let mut edge_ids = HashSet::with_capacity(node_doc.edges.len());
        for edge_ref in &node_doc.edges {
            edge_ids.insert(Id::parse_for(&edge_ref.id, "node edge id")?);
        }
        claimed.push((id, edge_ids));

        let mut node = Node::with_id(id).with_name(node_doc.name);
        node.frame = frame;
        network.add_node(node);
    }

    debug!("reading {} edge(s)", edges.edges.len());
    for edge_doc in edges.edges {
        let id = Id::parse_for(&edge_doc.id, "edge id")?;
        let kind = match (edge_doc.kind.as_str(), edge_doc.weight) {
            (EDGE_TYPE, _) => EdgeKind::Plain,
            (WEIGHTED_EDGE_TYPE, Some(w)) => EdgeKind::Weighted(w),
            (WEIGHTED_EDGE_TYPE, None) => {
                return Err(Error::corrupt(format!("weighted edge {id} has no weight")));
            }
            (other, _) => {
                return Err(Error::corrupt(format!(
                    "edge {id} has unknown type '{other}'"
                )));
            }
        };
        let start = resolve_endpoint(&network, &edge_doc.end1, id)?;
        let end = resolve_endpoint(&network, &edge_doc.end2, id)?;
        network
            .link_edge(start, end, Edge::with_id(id).with_kind(kind))
            .map_err(|e| Error::corrupt(format!("edge {id}: {e}")))?;
    }

    for (id, claimed_edges) in &claimed {
        let actual: HashSet<Id> = network
            .get_node(*id)
            .map(|n| {
                n.edges()
                    .iter()
                    .filter_map(|k| network.edge(*k).map(|e| e.id))
                    .collect()
            })
            .unwrap_or_default();
        if &actual != claimed_edges {
            return Err(Error::corrupt(format!(
                "node {id}: edge/node relationship is not mutual"
            )));
        }
    }

    debug!(
        "loaded network '{}': {} nodes, {} edges",
        network.name,
        network.node_count(),
        network.edge_count()
    );
    Ok(network)
}

fn resolve_endpoint(network: &Network, text: &str, edge: Id) -> Result<crate::NodeKey> {
    let id = Id::parse_for(text, "edge endpoint")?;
    network
        .node_key(id)
        .ok_or_else(|| Error::corrupt(format!("edge {edge} refers to unknown node {id}")))
}

/// Name of the first element in the document.
pub fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(Error::corrupt("document has no root element")),
            Err(e) => return Err(Error::parse(format!("Failed to read XML: {e}"))),
            Ok(_) => {}
        }
    }
}
