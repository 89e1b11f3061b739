//! Legacy index-based topology for Spannet.
//!
//! Nodes and edges are addressed by position. On top of the raw topology
//! this crate derives per-node interface directions and frames, classifies
//! branching nodes into trunk, left and right, and crawls the network for
//! chains of edges that continue each other.
//!
//! # Modules
//!
//! - [`topology`]: Nodes, edges, chains and the [`LegacyNetwork`] container
//! - [`builder`]: Node data, branching data, and construction from lines or
//!   meshes
//! - [`crawl`]: Chain crawling and overlap detection
//! - [`document`]: Legacy XML format
//! - [`convert`]: Conversion into a [`spannet_graph::Network`]

pub mod builder;
pub mod convert;
pub mod crawl;
pub mod document;
pub mod topology;

pub use convert::{BRANCH_WEIGHTS_ATTRIBUTE, BRANCHING_NODE_TAG, FOOT_NODE_TAG};
pub use document::{load_legacy, load_legacy_from_str, save_legacy, to_legacy_string};
pub use topology::{
    BranchCondition, BranchData, Chain, LegacyEdge, LegacyNetwork, LegacyNode, NodeInterface,
    NodeKind, TopologySettings,
};
