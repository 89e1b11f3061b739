//! Network validation and integrity checking.
//!
//! Detects structural problems that the store's own operations never
//! produce but that can appear after elements are released by an external
//! owner or assembled by hand: one-sided adjacency, edges pointing at
//! missing nodes, self-loops, parallel edges, unconnected nodes and stale
//! index entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::NodeKey;
use crate::network::Network;

// ============================================================================
// Types
// ============================================================================

/// Result of network validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the network is valid (no critical issues).
    pub valid: bool,
    /// Critical issues that should be fixed.
    pub errors: Vec<ValidationIssue>,
    /// Non-critical issues (warnings).
    pub warnings: Vec<ValidationIssue>,
    /// Informational findings.
    pub info: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }

    /// Add an error (marks network as invalid).
    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.valid = false;
        self.errors.push(issue);
    }

    /// Add a warning.
    pub fn add_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Add an informational finding.
    pub fn add_info(&mut self, issue: ValidationIssue) {
        self.info.push(issue);
    }

    /// Total issue count (errors + warnings).
    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    /// Find an issue of any severity by code.
    pub fn find(&self, code: &str) -> Option<&ValidationIssue> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.info)
            .find(|i| i.code == code)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A validation issue found in the network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Issue type/code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Affected node ids (if applicable).
    pub nodes: Vec<String>,
    /// Affected edge ids (if applicable).
    pub edges: Vec<String>,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Attach affected nodes.
    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Attach affected edges.
    pub fn with_edges(mut self, edges: Vec<String>) -> Self {
        self.edges = edges;
        self
    }
}

pub const NON_MUTUAL_ADJACENCY: &str = "NON_MUTUAL_ADJACENCY";
pub const DANGLING_EDGE: &str = "DANGLING_EDGE";
pub const SELF_LOOPS: &str = "SELF_LOOPS";
pub const DUPLICATE_EDGES: &str = "DUPLICATE_EDGES";
pub const ORPHAN_NODES: &str = "ORPHAN_NODES";
pub const STALE_INDEX_ENTRIES: &str = "STALE_INDEX_ENTRIES";

// ============================================================================
// Validation functions
// ============================================================================

/// Validate a network for common issues.
///
/// Checks for:
/// - Adjacency lists that disagree with edge endpoints
/// - Edges whose endpoints are missing
/// - Self-loops
/// - Several edges joining the same pair of nodes
/// - Orphan nodes (no connections)
/// - Index entries for elements that are gone
pub fn validate_network(network: &Network) -> ValidationResult {
    let mut result = ValidationResult::new();

    check_mutual_adjacency(network, &mut result);
    check_dangling_edges(network, &mut result);
    check_self_loops(network, &mut result);
    check_duplicate_edges(network, &mut result);
    check_orphans(network, &mut result);
    check_stale_index(network, &mut result);

    result
}

/// Quick check if a network has any validation errors.
pub fn is_valid(network: &Network) -> bool {
    validate_network(network).valid
}

// ============================================================================
// Individual checks
// ============================================================================

fn check_mutual_adjacency(network: &Network, result: &mut ValidationResult) {
    let bad: Vec<String> = network
        .non_mutual_nodes()
        .iter()
        .map(|id| id.to_string())
        .collect();

    if !bad.is_empty() {
        result.add_error(
            ValidationIssue::new(
                NON_MUTUAL_ADJACENCY,
                format!("{} node(s) disagree with their edges", bad.len()),
            )
            .with_nodes(bad),
        );
    }
}

fn check_dangling_edges(network: &Network, result: &mut ValidationResult) {
    let live = |k: Option<NodeKey>| k.is_some_and(|k| network.node(k).is_some());
    let dangling: Vec<String> = network
        .edges()
        .filter(|(_, e)| !live(e.start()) || !live(e.end()))
        .map(|(_, e)| e.id.to_string())
        .collect();

    if !dangling.is_empty() {
        result.add_error(
            ValidationIssue::new(
                DANGLING_EDGE,
                format!("{} edge(s) have a missing endpoint", dangling.len()),
            )
            .with_edges(dangling),
        );
    }
}

fn check_self_loops(network: &Network, result: &mut ValidationResult) {
    let loops: Vec<String> = network
        .edges()
        .filter(|(_, e)| e.endpoints().is_some_and(|(s, t)| s == t))
        .map(|(_, e)| e.id.to_string())
        .collect();

    if !loops.is_empty() {
        result.add_error(
            ValidationIssue::new(SELF_LOOPS, format!("{} edge(s) are self-loops", loops.len()))
                .with_edges(loops),
        );
    }
}

fn check_duplicate_edges(network: &Network, result: &mut ValidationResult) {
    let mut seen: HashMap<(NodeKey, NodeKey), usize> = HashMap::new();
    let mut duplicates: Vec<String> = Vec::new();

    for (_, edge) in network.edges() {
        let Some((s, t)) = edge.endpoints() else {
            continue;
        };
        let pair = if s <= t { (s, t) } else { (t, s) };
        let count = seen.entry(pair).or_insert(0);
        *count += 1;
        if *count > 1 {
            duplicates.push(edge.id.to_string());
        }
    }

    if !duplicates.is_empty() {
        result.add_warning(
            ValidationIssue::new(
                DUPLICATE_EDGES,
                format!("{} duplicate edge(s) found", duplicates.len()),
            )
            .with_edges(duplicates),
        );
    }
}

fn check_orphans(network: &Network, result: &mut ValidationResult) {
    let orphans: Vec<String> = network
        .nodes()
        .filter(|(_, n)| n.valence() == 0)
        .map(|(_, n)| n.id.to_string())
        .collect();

    if !orphans.is_empty() {
        result.add_warning(
            ValidationIssue::new(
                ORPHAN_NODES,
                format!("{} node(s) have no connections", orphans.len()),
            )
            .with_nodes(orphans),
        );
    }
}

fn check_stale_index(network: &Network, result: &mut ValidationResult) {
    let stale = network.stale_index_entries();
    if stale > 0 {
        result.add_info(ValidationIssue::new(
            STALE_INDEX_ENTRIES,
            format!("{stale} index entr(ies) point at released elements; run clean"),
        ));
    }
}

// ============================================================================
// Tests
// ============================================================================
