//! Network persistence.
//!
//! Two on-disk representations are supported:
//!
//! - [`document`]: structured XML, nodes listing their edges and edges
//!   naming their end nodes, reconciled on load
//! - [`records`]: flat JSON records with every reference written as an id,
//!   also used for deep copies
//!
//! [`load_network`] and [`save_network`] pick the representation from the
//! file extension.

pub mod document;
pub mod records;

use std::path::Path;

use spannet_core::{Error, Result};

use crate::network::Network;

pub use document::{
    FrameDoc, load_document, load_document_from_str, root_element, save_document,
    to_document_string,
};
pub use records::{
    EdgeRecord, NetworkRecords, NodeRecord, load_records, load_records_from_str, records_to_json,
    save_records,
};

/// On-disk representation of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkFormat {
    /// XML document (`.xml`).
    Document,
    /// JSON records (`.json`).
    Records,
}

impl NetworkFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xml") => Ok(Self::Document),
            Some("json") => Ok(Self::Records),
            _ => Err(Error::invalid_input(format!(
                "cannot tell network format of {} (expected .xml or .json)",
                path.display()
            ))),
        }
    }
}

/// Load a network, choosing the format from the extension.
pub fn load_network(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    match NetworkFormat::from_path(path)? {
        NetworkFormat::Document => load_document(path),
        NetworkFormat::Records => load_records(path),
    }
}

/// Save a network, choosing the format from the extension.
pub fn save_network(network: &Network, path: impl AsRef<Path>, create_dir: bool) -> Result<()> {
    let path = path.as_ref();
    match NetworkFormat::from_path(path)? {
        NetworkFormat::Document => save_document(network, path, create_dir),
        NetworkFormat::Records => save_records(network, path, create_dir),
    }
}
