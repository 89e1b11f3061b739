//! Utility modules.
//!
//! # Modules
//!
//! - [`paths`]: Path resolution helpers (tilde expansion, output directories)

pub mod paths;
