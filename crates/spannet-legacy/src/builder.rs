//! Node data and branching classification, plus constructors from lines
//! and meshes.

use std::collections::HashSet;

use glam::DVec3;
use log::{debug, warn};
use spannet_core::{Error, Frame, Line, Result};
use spannet_graph::MeshTopology;

use crate::topology::{
    BranchData, LegacyEdge, LegacyNetwork, LegacyNode, NodeInterface, NodeKind, TopologySettings,
};

/// Below this length a summed normal counts as degenerate.
const NORMAL_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Node data
// ============================================================================

impl LegacyNetwork {
    /// Rebuild every node's interfaces from the edges.
    ///
    /// Interfaces point outward from the node. Nodes left with a single
    /// edge become feet. Optionally recomputes each node's frame from its
    /// interfaces and flattens the interfaces into the frame plane.
    pub fn build_node_data(&mut self, calc_frames: bool, project_vectors: bool) -> Result<()> {
        self.check_edges()?;

        for node in &mut self.nodes {
            node.interfaces.clear();
        }
        for (e, edge) in self.edges.iter().enumerate() {
            let (i, j) = edge.ends;
            let v =
                (self.nodes[i].frame.origin() - self.nodes[j].frame.origin()).normalize_or_zero();
            if v == DVec3::ZERO {
                warn!("edge {e} has coincident ends; its interfaces have no direction");
            }
            self.nodes[i].interfaces.push(NodeInterface::new(-v, e));
            self.nodes[j].interfaces.push(NodeInterface::new(v, e));
        }

        for node in &mut self.nodes {
            if node.valence() == 1 {
                node.kind = NodeKind::Foot;
            }
        }
        if calc_frames {
            for node in &mut self.nodes {
                node.calculate_average_frame();
            }
        }
        if project_vectors {
            for node in self.nodes.iter_mut().filter(|n| !n.is_foot()) {
                node.project_interfaces();
            }
        }
        if self.settings.enforce_continuity_in_pairs {
            for node in self.nodes.iter_mut().filter(|n| n.valence() == 2) {
                let av = (node.interfaces[0].direction - node.interfaces[1].direction)
                    .normalize_or_zero();
                node.interfaces[0].direction = av;
                node.interfaces[1].direction = -av;
            }
        }

        debug!(
            "Built node data for {} nodes and {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }

    /// Pick the trunk of every branching node, sort its branches into left
    /// and right, and turn its frame so the Y axis follows the trunk.
    pub fn build_branching_data(&mut self) {
        for node in &mut self.nodes {
            if matches!(node.kind, NodeKind::Branching(_)) {
                node.classify_branches();
            }
        }
    }
}

// ============================================================================
// Per-node geometry
// ============================================================================

impl LegacyNode {
    /// Recompute the frame normal from the interface directions.
    ///
    /// Two interfaces give a normal opposite their sum. Three or more are
    /// ordered around the node and the cross products of neighbours summed.
    /// The frame is left alone when no usable normal comes out.
    pub fn calculate_average_frame(&mut self) {
        let dirs: Vec<DVec3> = self.interfaces.iter().map(|ni| ni.direction).collect();
        let normal = match dirs.len() {
            0 | 1 => return,
            2 => -dirs[0] - dirs[1],
            n => {
                let order = sort_around(&dirs);
                let mut sum = DVec3::ZERO;
                for k in 0..n {
                    sum += dirs[order[k]].cross(dirs[order[(k + 1) % n]]);
                }
                if sum.length() < NORMAL_TOLERANCE {
                    sum = dirs[0].normalize_or_zero().cross(dirs[1].normalize_or_zero());
                }
                sum
            }
        };
        if let Some(frame) = Frame::from_normal(self.frame.origin(), normal) {
            self.frame = frame;
        }
    }

    /// Flatten every interface into the frame plane.
    pub fn project_interfaces(&mut self) {
        for ni in &mut self.interfaces {
            ni.direction = self.frame.project_to_plane(ni.direction).normalize_or_zero();
        }
    }

    fn classify_branches(&mut self) {
        let n = self.interfaces.len();
        if n == 0 {
            return;
        }

        // The trunk is the interface most opposed to all the others.
        let mut trunk = 0;
        let mut best = f64::NEG_INFINITY;
        for j in 0..n {
            let score: f64 = (0..n)
                .filter(|k| *k != j)
                .map(|k| -self.interfaces[j].direction.dot(self.interfaces[k].direction))
                .sum();
            if score > best {
                best = score;
                trunk = j;
            }
        }

        let normal = self.frame.z_axis();
        self.sort_edges_lr(trunk, normal);

        let trunk_proj = self.frame.project_to_plane(self.interfaces[0].direction);
        if trunk_proj.length() < NORMAL_TOLERANCE {
            return;
        }
        let angle = self.frame.y_axis().angle_between(trunk_proj);
        if self.frame.x_axis().dot(trunk_proj) < 0.0 {
            self.frame.rotate_about_normal(angle);
        } else {
            self.frame.rotate_about_normal(-angle);
        }
    }

    /// Put the trunk first and the remaining interfaces in left-to-right
    /// order about `normal`.
    ///
    /// Each branch's sort key is kept in its `scalar`.
    pub fn sort_edges_lr(&mut self, trunk: usize, normal: DVec3) {
        let Some(trunk_iface) = self.interfaces.get(trunk).cloned() else {
            return;
        };
        let sort_vec = trunk_iface
            .direction
            .normalize_or_zero()
            .cross(normal.normalize_or_zero());

        let mut others: Vec<NodeInterface> = self
            .interfaces
            .iter()
            .filter(|ni| ni.edge != trunk_iface.edge)
            .cloned()
            .collect();
        for ni in &mut others {
            ni.scalar = ni.direction.dot(sort_vec);
        }
        others.sort_by(|a, b| a.scalar.total_cmp(&b.scalar));

        self.interfaces = std::iter::once(trunk_iface).chain(others).collect();
        let weights = match &self.kind {
            NodeKind::Branching(data) => data.weights.clone(),
            _ => Vec::new(),
        };
        self.kind = NodeKind::Branching(BranchData::sorted(weights));
    }
}

/// Indices of `dirs` ordered by angle around the plane of the first two.
fn sort_around(dirs: &[DVec3]) -> Vec<usize> {
    let basis = Frame::from_normal(DVec3::ZERO, dirs[0].cross(dirs[1])).unwrap_or_default();
    let (x, y) = (basis.x_axis(), basis.y_axis());
    let angles: Vec<f64> = dirs.iter().map(|d| d.dot(y).atan2(d.dot(x))).collect();
    let mut order: Vec<usize> = (0..dirs.len()).collect();
    order.sort_by(|a, b| angles[*a].total_cmp(&angles[*b]));
    order
}

// ============================================================================
// Constructors
// ============================================================================

impl LegacyNetwork {
    /// Build a network from line segments.
    ///
    /// Endpoints within `node_merge_distance` of an earlier endpoint share
    /// its node. Nodes take the world Z as normal, or the normal of the
    /// nearest `surface` vertex within `mesh_max_distance`. With
    /// `branching`, valence-3 nodes are classified as branching.
    pub fn from_lines(
        lines: &[Line],
        settings: TopologySettings,
        branching: bool,
        surface: Option<&MeshTopology>,
    ) -> Result<Self> {
        let raw: Vec<DVec3> = lines.iter().flat_map(|l| [l.from, l.to]).collect();
        let merge = settings.node_merge_distance;

        let mut remap = vec![0usize; raw.len()];
        let mut merged = vec![false; raw.len()];
        let mut points: Vec<DVec3> = Vec::new();
        for i in 0..raw.len() {
            if merged[i] {
                continue;
            }
            remap[i] = points.len();
            for j in (i + 1)..raw.len() {
                if !merged[j] && raw[i].distance(raw[j]) < merge {
                    remap[j] = points.len();
                    merged[j] = true;
                }
            }
            points.push(raw[i]);
        }

        let mut net = LegacyNetwork::new(settings);
        for p in &points {
            let frame = surface
                .and_then(|mesh| surface_normal(mesh, *p, net.settings.mesh_max_distance))
                .and_then(|n| Frame::from_normal(*p, n))
                .unwrap_or_else(|| Frame::at(*p));
            net.nodes.push(LegacyNode::new(frame));
        }
        for (k, line) in lines.iter().enumerate() {
            let (a, b) = (remap[2 * k], remap[2 * k + 1]);
            if a == b {
                warn!("line {k} collapses to a single node and is skipped");
                continue;
            }
            let mut edge = LegacyEdge::new(a, b);
            edge.curve = vec![line.from, line.to];
            net.edges.push(edge);
        }

        net.build_node_data(false, true)?;
        if branching {
            for node in net.nodes.iter_mut().filter(|n| n.valence() == 3) {
                node.kind = NodeKind::Branching(BranchData::default());
            }
            net.build_branching_data();
        }

        debug!(
            "Built legacy network from {} lines: {} nodes, {} edges",
            lines.len(),
            net.nodes.len(),
            net.edges.len()
        );
        Ok(net)
    }

    /// Build a network from mesh topology, one node per vertex.
    pub fn from_mesh(
        mesh: &MeshTopology,
        settings: TopologySettings,
        branching: bool,
    ) -> Result<Self> {
        if mesh.normals.len() != mesh.vertices.len() {
            return Err(Error::invalid_input(format!(
                "mesh has {} vertices but {} normals",
                mesh.vertices.len(),
                mesh.normals.len()
            )));
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for &(a, b) in &mesh.edges {
            if a >= mesh.vertices.len() || b >= mesh.vertices.len() {
                return Err(Error::invalid_input(format!(
                    "mesh edge ({a}, {b}) refers to a missing vertex"
                )));
            }
            if a != b && seen.insert((a.min(b), a.max(b))) {
                pairs.push((a, b));
            }
        }

        let mut valence = vec![0usize; mesh.vertices.len()];
        for &(a, b) in &pairs {
            valence[a] += 1;
            valence[b] += 1;
        }

        let mut net = LegacyNetwork::new(settings);
        for (i, (v, n)) in mesh.vertices.iter().zip(&mesh.normals).enumerate() {
            let kind = match valence[i] {
                3 if branching => NodeKind::Branching(BranchData::default()),
                1 => NodeKind::Foot,
                _ => NodeKind::Ordinary,
            };
            let frame = Frame::from_normal(*v, *n).unwrap_or_else(|| Frame::at(*v));
            net.nodes.push(LegacyNode::new(frame).with_kind(kind));
        }
        for (a, b) in pairs {
            let mut edge = LegacyEdge::new(a, b);
            edge.curve = vec![mesh.vertices[a], mesh.vertices[b]];
            net.edges.push(edge);
        }

        net.build_node_data(false, false)?;
        net.build_branching_data();
        Ok(net)
    }
}

/// Normal of the mesh vertex nearest `point`, if within `max_distance`.
fn surface_normal(mesh: &MeshTopology, point: DVec3, max_distance: f64) -> Option<DVec3> {
    mesh.vertices
        .iter()
        .zip(&mesh.normals)
        .map(|(v, n)| (v.distance(point), *n))
        .filter(|(d, _)| *d <= max_distance)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, n)| n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Centre at the origin with leaves along +X, -X and +Y.
    fn star_lines() -> Vec<Line> {
        vec![
            Line::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0)),
            Line::new(DVec3::ZERO, DVec3::new(-10.0, 0.0, 0.0)),
            Line::new(DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)),
        ]
    }

    #[test]
    fn test_star_node_data() {
        let net = LegacyNetwork::from_lines(&star_lines(), TopologySettings::default(), false, None)
            .unwrap();
        assert_eq!(net.nodes.len(), 4);
        assert_eq!(net.edges.len(), 3);
        assert_eq!(net.nodes[0].valence(), 3);
        assert_eq!(net.nodes.iter().filter(|n| n.is_foot()).count(), 3);

        let centre = &net.nodes[0];
        assert!(centre.interfaces[0].direction.abs_diff_eq(DVec3::X, EPS));
        assert!(centre.interfaces[1].direction.abs_diff_eq(DVec3::NEG_X, EPS));
        assert!(centre.interfaces[2].direction.abs_diff_eq(DVec3::Y, EPS));
        // Feet point back at the centre.
        assert!(net.nodes[1].interfaces[0].direction.abs_diff_eq(DVec3::NEG_X, EPS));
    }

    #[test]
    fn test_star_branching_classification() {
        let net = LegacyNetwork::from_lines(&star_lines(), TopologySettings::default(), true, None)
            .unwrap();
        let centre = &net.nodes[0];
        let data = centre.branch_data().unwrap();
        assert_eq!((data.trunk, data.left, data.right), (0, 1, 2));

        // +X and -X tie as most opposed; the first wins.
        assert_eq!(centre.interfaces[0].edge, 0);
        assert_eq!(centre.interfaces[1].edge, 2);
        assert_eq!(centre.interfaces[2].edge, 1);
        assert!((centre.interfaces[1].scalar + 1.0).abs() < EPS);
        assert!(centre.interfaces[2].scalar.abs() < EPS);

        // Frame Y now follows the trunk.
        assert!(centre.frame.y_axis().abs_diff_eq(DVec3::X, EPS));
        assert!(centre.frame.z_axis().abs_diff_eq(DVec3::Z, EPS));
        assert!(net.nodes[1].is_foot());
    }

    #[test]
    fn test_lines_merge_nearby_endpoints() {
        let lines = vec![
            Line::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0)),
            Line::new(DVec3::new(10.5, 0.5, 0.0), DVec3::new(20.0, 0.0, 0.0)),
        ];
        let net = LegacyNetwork::from_lines(&lines, TopologySettings::default(), false, None)
            .unwrap();
        assert_eq!(net.nodes.len(), 3);
        assert_eq!(net.edges[1].ends, (1, 2));
        // Merged node keeps the first point.
        assert_eq!(net.nodes[1].frame.origin(), DVec3::new(10.0, 0.0, 0.0));
        // Valence-2 interfaces are forced opposite.
        let node = &net.nodes[1];
        assert!((node.interfaces[0].direction + node.interfaces[1].direction).length() < EPS);
    }

    #[test]
    fn test_collapsed_line_skipped() {
        let lines = vec![
            Line::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)),
            Line::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0)),
        ];
        let net = LegacyNetwork::from_lines(&lines, TopologySettings::default(), false, None)
            .unwrap();
        assert_eq!(net.nodes.len(), 2);
        assert_eq!(net.edges.len(), 1);
    }

    #[test]
    fn test_surface_normals() {
        let surface = MeshTopology {
            vertices: vec![DVec3::ZERO],
            normals: vec![DVec3::X],
            edges: Vec::new(),
        };
        let lines = vec![
            Line::new(DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)),
            Line::new(DVec3::new(0.0, 10.0, 0.0), DVec3::new(0.0, 500.0, 0.0)),
        ];
        let net =
            LegacyNetwork::from_lines(&lines, TopologySettings::default(), false, Some(&surface))
                .unwrap();
        assert!(net.nodes[0].frame.z_axis().abs_diff_eq(DVec3::X, EPS));
        assert!(net.nodes[2].frame.z_axis().abs_diff_eq(DVec3::Z, EPS));
    }

    #[test]
    fn test_average_frame() {
        let mut node = LegacyNode::new(Frame::at(DVec3::ZERO));
        node.interfaces.push(NodeInterface::new(DVec3::X, 0));
        node.interfaces.push(NodeInterface::new(DVec3::Y, 1));
        node.calculate_average_frame();
        let expected = -(DVec3::X + DVec3::Y).normalize();
        assert!(node.frame.z_axis().abs_diff_eq(expected, EPS));

        // Straight pair has no usable normal.
        let mut straight = LegacyNode::new(Frame::at(DVec3::ZERO));
        straight.interfaces.push(NodeInterface::new(DVec3::X, 0));
        straight.interfaces.push(NodeInterface::new(DVec3::NEG_X, 1));
        straight.calculate_average_frame();
        assert!(straight.frame.z_axis().abs_diff_eq(DVec3::Z, EPS));

        let mut three = LegacyNode::new(Frame::at(DVec3::ZERO));
        for (e, d) in [DVec3::X, DVec3::Y, DVec3::NEG_X].into_iter().enumerate() {
            three.interfaces.push(NodeInterface::new(d, e));
        }
        three.calculate_average_frame();
        assert!(three.frame.z_axis().cross(DVec3::Z).length() < EPS);
    }

    #[test]
    fn test_mesh_constructor() {
        // Square with one diagonal: two valence-3 corners.
        let mesh = MeshTopology {
            vertices: vec![
                DVec3::ZERO,
                DVec3::new(10.0, 0.0, 0.0),
                DVec3::new(10.0, 10.0, 0.0),
                DVec3::new(0.0, 10.0, 0.0),
            ],
            normals: vec![DVec3::Z; 4],
            edges: vec![(0, 1), (1, 2), (2, 3), (3, 0), (0, 2), (2, 0)],
        };
        let net = LegacyNetwork::from_mesh(&mesh, TopologySettings::default(), true).unwrap();
        assert_eq!(net.edges.len(), 5);
        assert!(net.nodes[0].branch_data().is_some());
        assert!(net.nodes[1].branch_data().is_none());
        assert_eq!(net.nodes[0].valence(), 3);

        let bad = MeshTopology {
            normals: vec![DVec3::Z],
            ..mesh
        };
        assert!(LegacyNetwork::from_mesh(&bad, TopologySettings::default(), false)
            .unwrap_err()
            .is_invalid_input());
    }

    #[test]
    fn test_build_rejects_bad_edge() {
        let mut net = LegacyNetwork::new(TopologySettings::default());
        net.nodes.push(LegacyNode::new(Frame::at(DVec3::ZERO)));
        net.edges.push(LegacyEdge::new(0, 3));
        assert!(net.build_node_data(false, false).unwrap_err().is_invalid_input());

        net.edges[0] = LegacyEdge::new(0, 0);
        assert!(net.build_node_data(false, false).unwrap_err().is_invalid_input());
    }
}
