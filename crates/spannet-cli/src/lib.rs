//! Command-line front end for Spannet.
//!
//! - [`cli`]: argument definitions
//! - [`config`]: `confyg`-backed configuration
//! - [`app`]: logging set-up and dispatch
//! - [`network_handlers`] and [`config_handlers`]: command implementations

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod network_handlers;

pub use app::SpannetApp;
pub use cli::CliArgs;
pub use config::SpannetConfig;
