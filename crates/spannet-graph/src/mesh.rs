//! Mesh topology adapter.
//!
//! Turns a polygon mesh's topological vertices and edges into a spatial
//! network: one node per vertex, framed by the vertex normal, and one edge
//! per unique topological edge.

use std::collections::HashSet;

use glam::DVec3;
use log::{debug, warn};
use spannet_core::{Error, Frame, Result};

use crate::element::Node;
use crate::network::Network;

/// Topological view of a polygon mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshTopology {
    /// Vertex positions.
    pub vertices: Vec<DVec3>,
    /// Per-vertex normals, parallel to `vertices`.
    pub normals: Vec<DVec3>,
    /// Vertex index pairs.
    pub edges: Vec<(usize, usize)>,
}

impl MeshTopology {
    /// Derive topology from faces given as vertex index loops.
    ///
    /// Edges are the unique unordered pairs of consecutive face vertices in
    /// order of first appearance. Normals are area weighted: each face adds
    /// its Newell normal to all of its vertices.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if a face has fewer than three vertices or
    /// refers to a vertex that does not exist.
    pub fn from_faces(vertices: Vec<DVec3>, faces: &[Vec<usize>]) -> Result<Self> {
        let mut normals = vec![DVec3::ZERO; vertices.len()];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut edges = Vec::new();

        for (f, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(Error::invalid_input(format!(
                    "face {f} has {} vertices, need at least 3",
                    face.len()
                )));
            }
            if let Some(bad) = face.iter().find(|i| **i >= vertices.len()) {
                return Err(Error::invalid_input(format!(
                    "face {f} refers to missing vertex {bad}"
                )));
            }

            let mut newell = DVec3::ZERO;
            for (k, &i) in face.iter().enumerate() {
                let j = face[(k + 1) % face.len()];
                let (p, q) = (vertices[i], vertices[j]);
                newell += DVec3::new(
                    (p.y - q.y) * (p.z + q.z),
                    (p.z - q.z) * (p.x + q.x),
                    (p.x - q.x) * (p.y + q.y),
                );
                let pair = if i < j { (i, j) } else { (j, i) };
                if i != j && seen.insert(pair) {
                    edges.push((i, j));
                }
            }
            for &i in face {
                normals[i] += newell;
            }
        }

        let normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(DVec3::Z))
            .collect();
        Ok(Self {
            vertices,
            normals,
            edges,
        })
    }
}

impl Network {
    /// Build a spatial network from mesh topology.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the normals do not match the vertices, or
    /// an edge refers to a missing vertex or joins a vertex to itself.
    pub fn from_mesh(mesh: &MeshTopology, name: impl Into<String>) -> Result<Network> {
        if mesh.normals.len() != mesh.vertices.len() {
            return Err(Error::invalid_input(format!(
                "mesh has {} vertices but {} normals",
                mesh.vertices.len(),
                mesh.normals.len()
            )));
        }

        let mut net = Network::new(name);
        let keys: Vec<_> = mesh
            .vertices
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| {
                let frame = Frame::from_normal(*p, *n).unwrap_or_else(|| {
                    warn!("degenerate normal at {p}, using world Z");
                    Frame::at(*p)
                });
                net.add_node(Node::spatial(frame))
            })
            .collect();

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for &(i, j) in &mesh.edges {
            let (Some(a), Some(b)) = (keys.get(i), keys.get(j)) else {
                return Err(Error::invalid_input(format!(
                    "mesh edge ({i}, {j}) refers to a missing vertex"
                )));
            };
            if !seen.insert(if i < j { (i, j) } else { (j, i) }) {
                continue;
            }
            net.link(*a, *b, None)?;
        }

        debug!(
            "built network '{}' from mesh: {} nodes, {} edges",
            net.name,
            net.node_count(),
            net.edge_count()
        );
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshTopology {
        let vertices = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        MeshTopology::from_faces(vertices, &[vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_from_faces_quad() {
        let mesh = quad();
        assert_eq!(mesh.edges, vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
        for n in &mesh.normals {
            assert!(n.abs_diff_eq(DVec3::Z, 1e-12));
        }
    }

    #[test]
    fn test_from_faces_shared_edge() {
        let vertices = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = MeshTopology::from_faces(vertices, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap();
        assert_eq!(mesh.edges.len(), 5);
    }

    #[test]
    fn test_from_faces_rejects_bad_faces() {
        let vertices = vec![DVec3::ZERO, DVec3::X];
        assert!(MeshTopology::from_faces(vertices.clone(), &[vec![0, 1]]).is_err());
        assert!(MeshTopology::from_faces(vertices, &[vec![0, 1, 5]]).is_err());
    }

    #[test]
    fn test_from_mesh_quad() {
        let net = Network::from_mesh(&quad(), "quad").unwrap();
        assert_eq!(net.node_count(), 4);
        assert_eq!(net.edge_count(), 4);
        assert!(net.nodes().all(|(_, n)| n.valence() == 2));
        assert!(net.nodes().all(|(_, n)| n.is_spatial()));
        assert!(net.check_mutual().is_ok());
    }

    #[test]
    fn test_from_mesh_dedupes_edges() {
        let mut mesh = quad();
        mesh.edges.push((1, 0));
        let net = Network::from_mesh(&mesh, "quad").unwrap();
        assert_eq!(net.edge_count(), 4);
    }

    #[test]
    fn test_from_mesh_rejects_mismatched_normals() {
        let mut mesh = quad();
        mesh.normals.pop();
        assert!(Network::from_mesh(&mesh, "bad").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_from_mesh_rejects_self_edge() {
        let mut mesh = quad();
        mesh.edges.push((2, 2));
        assert!(Network::from_mesh(&mesh, "bad").unwrap_err().is_invalid_input());
    }
}
