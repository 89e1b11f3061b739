//! Configuration for the `spannet` tool.
//!
//! Provides the [`SpannetConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `SPANNET_CONFIG` environment variable
//! 3. XDG default: `~/.config/spannet/config.toml`
//! 4. Built-in defaults

use std::path::PathBuf;

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use spannet_core::util::paths::expand_tilde;
use spannet_core::{Error, Result};
use spannet_graph::DEFAULT_NETWORK_NAME;
use spannet_legacy::TopologySettings;

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpannetConfig {
    /// Network store settings.
    pub network: NetworkConfig,

    /// Legacy topology building.
    pub topology: TopologySettings,

    /// Chain crawling.
    pub crawl: CrawlConfig,
}

/// Network store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Name given to networks built from legacy documents.
    pub default_name: String,

    /// Create missing output directories when saving.
    pub create_dirs: bool,
}

/// Crawl defaults, overridable per command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Continuation threshold on the dot product of interface directions.
    pub angle_limit: f64,

    /// Fixed seed for reproducible crawls; random when unset.
    pub seed: Option<u64>,

    /// Shortest shared run reported as an overlap.
    pub min_overlap: usize,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_NETWORK_NAME.to_string(),
            create_dirs: false,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            angle_limit: 0.5,
            seed: None,
            min_overlap: 2,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl SpannetConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("SPANNET");
        env_opts.add_section("network");
        env_opts.add_section("topology");
        env_opts.add_section("crawl");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(expand_tilde(path));
        }
        if let Ok(path) = std::env::var("SPANNET_CONFIG") {
            return Some(expand_tilde(path));
        }
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("spannet").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
