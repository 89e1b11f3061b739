//! Spatial network store for Spannet.
//!
//! This crate provides the identifier-based network: nodes and edges kept
//! in generational arenas, looked up by [`Id`](spannet_core::Id) through an
//! index that tolerates released elements, plus persistence, grouping and
//! analysis on top of it.
//!
//! # Modules
//!
//! - [`network`]: The [`Network`] store (link, unlink, cascade removal,
//!   copies, projections)
//! - [`element`]: [`Node`], [`Edge`] and their handles
//! - [`group`]: Named node groups
//! - [`mesh`]: Mesh topology adapter
//! - [`persistence`]: XML document and JSON record formats
//! - [`validation`]: Integrity checks
//! - [`stats`]: Structural statistics

pub mod arena;
pub mod element;
pub mod group;
pub mod mesh;
pub mod network;
pub mod persistence;
pub mod stats;
pub mod validation;

pub use element::{Attributes, Edge, EdgeKey, EdgeKind, ElementRef, Node, NodeKey};
pub use group::{NodeGroup, SharedElements};
pub use mesh::MeshTopology;
pub use network::{DEFAULT_NETWORK_NAME, NETWORK_VERSION, Network};
pub use persistence::{NetworkFormat, load_network, save_network};
pub use stats::{NetworkStats, compute_stats};
pub use validation::{ValidationIssue, ValidationResult, validate_network};
