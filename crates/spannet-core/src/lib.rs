//! Spannet core: shared types, errors, and geometry primitives.
//!
//! This crate provides the foundational types used across all Spannet crates.
//! It has no internal Spannet dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`ids`]: Globally unique identifiers for network elements
//! - [`frame`]: 3D origin + orientation frames
//! - [`line`]: Straight line segments
//! - [`util`]: Path helpers

pub mod error;
pub mod frame;
pub mod ids;
pub mod line;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use frame::Frame;
pub use ids::Id;
pub use line::Line;

/// Re-exported so downstream crates agree on the vector types.
pub use glam::{DQuat, DVec3};
