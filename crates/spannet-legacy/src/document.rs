//! Legacy XML format.
//!
//! Edges are written as index pairs and nodes with their interfaces, branch
//! weights and frame:
//!
//! ```xml
//! <network>
//!   <edges>
//!     <edge index="0" end1="0" end2="1"/>
//!   </edges>
//!   <nodes>
//!     <node index="0" type="FootNode">
//!       <node_edges>
//!         <node_edge index="0" vX="1" vY="0" vZ="0" weight="1" user_data="0"/>
//!       </node_edges>
//!       <frame PosX="0" PosY="0" PosZ="0" XX="1" XY="0" XZ="0" YX="0" YY="1" YZ="0"/>
//!     </node>
//!   </nodes>
//! </network>
//! ```
//!
//! Chains are not stored.

use std::path::Path;

use glam::DVec3;
use log::debug;
use serde::{Deserialize, Serialize};
use spannet_core::util::paths::ensure_parent_dir;
use spannet_core::{Error, Result};
use spannet_graph::persistence::{FrameDoc, root_element};

use crate::topology::{
    BranchData, LegacyEdge, LegacyNetwork, LegacyNode, NodeInterface, NodeKind, TopologySettings,
};

const ROOT_ELEMENT: &str = "network";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LegacyDoc {
    #[serde(default)]
    edges: EdgesDoc,
    #[serde(default)]
    nodes: NodesDoc,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EdgesDoc {
    #[serde(rename = "edge", default)]
    edges: Vec<EdgeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeDoc {
    #[serde(rename = "@index")]
    index: usize,
    #[serde(rename = "@end1")]
    end1: usize,
    #[serde(rename = "@end2")]
    end2: usize,
    #[serde(rename = "@weight", default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NodesDoc {
    #[serde(rename = "node", default)]
    nodes: Vec<NodeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeDoc {
    #[serde(rename = "@index")]
    index: usize,
    #[serde(rename = "@type")]
    kind: String,
    #[serde(default)]
    node_edges: InterfacesDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch_weights: Option<BranchWeightsDoc>,
    frame: Option<FrameDoc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InterfacesDoc {
    #[serde(rename = "node_edge", default)]
    interfaces: Vec<InterfaceDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InterfaceDoc {
    #[serde(rename = "@index")]
    edge: usize,
    #[serde(rename = "@vX")]
    x: f64,
    #[serde(rename = "@vY")]
    y: f64,
    #[serde(rename = "@vZ")]
    z: f64,
    #[serde(rename = "@weight", default = "default_weight")]
    weight: i32,
    #[serde(rename = "@user_data", default)]
    user_data: f64,
}

fn default_weight() -> i32 {
    1
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BranchWeightsDoc {
    #[serde(rename = "branch_weight", default)]
    weights: Vec<BranchWeightDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BranchWeightDoc {
    #[serde(rename = "@index")]
    index: usize,
    #[serde(rename = "$text")]
    value: i32,
}

// ============================================================================
// Write
// ============================================================================

/// Render a legacy network as XML.
pub fn to_legacy_string(network: &LegacyNetwork) -> Result<String> {
    let edges = network
        .edges
        .iter()
        .enumerate()
        .map(|(index, e)| EdgeDoc {
            index,
            end1: e.ends.0,
            end2: e.ends.1,
            weight: (e.weight != 0.0).then_some(e.weight),
        })
        .collect();

    let nodes = network
        .nodes
        .iter()
        .enumerate()
        .map(|(index, n)| NodeDoc {
            index,
            kind: n.kind.type_name().to_string(),
            node_edges: InterfacesDoc {
                interfaces: n
                    .interfaces
                    .iter()
                    .map(|ni| InterfaceDoc {
                        edge: ni.edge,
                        x: ni.direction.x,
                        y: ni.direction.y,
                        z: ni.direction.z,
                        weight: ni.weight,
                        user_data: ni.scalar,
                    })
                    .collect(),
            },
            branch_weights: n.branch_data().map(|data| BranchWeightsDoc {
                weights: data
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(index, value)| BranchWeightDoc {
                        index,
                        value: *value,
                    })
                    .collect(),
            }),
            frame: Some(FrameDoc::from(&n.frame)),
        })
        .collect();

    let doc = LegacyDoc {
        edges: EdgesDoc { edges },
        nodes: NodesDoc { nodes },
    };

    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut body, Some(ROOT_ELEMENT))
        .map_err(|e| Error::serialization(format!("Failed to serialize legacy network: {e}")))?;
    ser.indent(' ', 2);
    doc.serialize(ser)
        .map_err(|e| Error::serialization(format!("Failed to serialize legacy network: {e}")))?;

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}\n"
    ))
}

/// Write a legacy network to `path`.
pub fn save_legacy(
    network: &LegacyNetwork,
    path: impl AsRef<Path>,
    create_dir: bool,
) -> Result<()> {
    let path = path.as_ref();
    let xml = to_legacy_string(network)?;
    ensure_parent_dir(path, create_dir)?;
    std::fs::write(path, xml).map_err(|e| Error::io_with_path(e, path))?;
    debug!("Saved legacy network to {}", path.display());
    Ok(())
}

// ============================================================================
// Read
// ============================================================================

/// Read a legacy network from `path`.
pub fn load_legacy(path: impl AsRef<Path>, settings: TopologySettings) -> Result<LegacyNetwork> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::not_found(format!(
            "legacy network file {}",
            path.display()
        )));
    }
    let xml = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    let network = load_legacy_from_str(&xml, settings)?;
    debug!(
        "Loaded legacy network from {}: {} nodes, {} edges",
        path.display(),
        network.nodes.len(),
        network.edges.len()
    );
    Ok(network)
}

/// Parse a legacy network from XML text.
///
/// Nodes and edges are placed by their `index` attribute; indices must
/// cover `0..n` exactly once.
pub fn load_legacy_from_str(xml: &str, settings: TopologySettings) -> Result<LegacyNetwork> {
    let root = root_element(xml)?;
    if root != ROOT_ELEMENT {
        return Err(Error::corrupt(format!(
            "expected <{ROOT_ELEMENT}> root, found <{root}>"
        )));
    }
    let doc: LegacyDoc = quick_xml::de::from_str(xml)
        .map_err(|e| Error::parse(format!("Failed to parse legacy network: {e}")))?;

    let mut edges: Vec<Option<LegacyEdge>> = vec![None; doc.edges.edges.len()];
    for e in doc.edges.edges {
        let entry = slot(&mut edges, e.index, "edge")?;
        let mut edge = LegacyEdge::new(e.end1, e.end2);
        edge.weight = e.weight.unwrap_or_default();
        *entry = Some(edge);
    }

    let mut nodes: Vec<Option<LegacyNode>> = vec![None; doc.nodes.nodes.len()];
    for n in doc.nodes.nodes {
        let frame = n
            .frame
            .ok_or_else(|| Error::corrupt(format!("node {} has no frame", n.index)))?
            .to_frame()
            .ok_or_else(|| Error::corrupt(format!("node {} has a degenerate frame", n.index)))?;

        let kind = match n.kind.as_str() {
            "Node" => NodeKind::Ordinary,
            "FootNode" => NodeKind::Foot,
            "BranchingNode" => {
                let mut weights = n.branch_weights.map(|b| b.weights).unwrap_or_default();
                weights.sort_by_key(|w| w.index);
                NodeKind::Branching(BranchData::sorted(
                    weights.into_iter().map(|w| w.value).collect(),
                ))
            }
            other => {
                return Err(Error::corrupt(format!(
                    "node {} has unknown type {other:?}",
                    n.index
                )));
            }
        };

        let mut node = LegacyNode::new(frame).with_kind(kind);
        node.interfaces = n
            .node_edges
            .interfaces
            .into_iter()
            .map(|ni| NodeInterface {
                direction: DVec3::new(ni.x, ni.y, ni.z),
                edge: ni.edge,
                weight: ni.weight,
                scalar: ni.user_data,
            })
            .collect();
        let index = n.index;
        *slot(&mut nodes, index, "node")? = Some(node);
    }

    let mut network = LegacyNetwork::new(settings);
    network.nodes = nodes.into_iter().flatten().collect();
    network.edges = edges.into_iter().flatten().collect();

    network
        .check_edges()
        .map_err(|e| Error::corrupt(e.to_string()))?;
    for (i, node) in network.nodes.iter().enumerate() {
        if let Some(ni) = node.interfaces.iter().find(|ni| ni.edge >= network.edges.len()) {
            return Err(Error::corrupt(format!(
                "node {i} has an interface on missing edge {}",
                ni.edge
            )));
        }
    }
    Ok(network)
}

/// The empty slot for `index`, or a corrupt error for an out-of-range or
/// repeated index.
fn slot<'a, T>(items: &'a mut [Option<T>], index: usize, what: &str) -> Result<&'a mut Option<T>> {
    let count = items.len();
    match items.get_mut(index) {
        Some(slot) if slot.is_none() => Ok(slot),
        Some(_) => Err(Error::corrupt(format!("{what} index {index} appears twice"))),
        None => Err(Error::corrupt(format!(
            "{what} index {index} out of range ({count} {what}s)"
        ))),
    }
}
