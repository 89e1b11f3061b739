//! The `spannet` application: logging set-up and command dispatch.

use spannet_core::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::SpannetConfig;
use crate::network_handlers::{ConvertOptions, CrawlOptions};
use crate::{config_handlers, network_handlers};

// ============================================================================
// SpannetApp
// ============================================================================

/// CLI application holding the loaded configuration.
pub struct SpannetApp {
    name: String,
    config: SpannetConfig,
    version: String,
}

impl SpannetApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SpannetConfig::load(args.config.as_deref())?;
        Ok(Self::new("spannet", config))
    }

    /// Create a new application.
    pub fn new(name: impl Into<String>, config: SpannetConfig) -> Self {
        Self {
            name: name.into(),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &SpannetConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity
    /// flags. Library `log` records are forwarded to the same subscriber.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // A subscriber may already be set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Info { file, legacy, json }) => {
                network_handlers::handle_info(&self.config, &file, legacy, json)
            }
            Some(Command::Validate { file, legacy }) => {
                network_handlers::handle_validate(&self.config, &file, legacy)
            }
            Some(Command::Convert {
                input,
                output,
                legacy,
                create_dir,
            }) => network_handlers::handle_convert(
                &self.config,
                ConvertOptions {
                    input,
                    output,
                    legacy,
                    create_dir,
                },
            ),
            Some(Command::Crawl {
                file,
                angle_limit,
                seed,
                min_overlap,
                branching,
                output,
            }) => network_handlers::handle_crawl(
                &self.config,
                CrawlOptions {
                    file,
                    angle_limit,
                    seed,
                    min_overlap,
                    branching,
                    output,
                },
            ),
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("{} {} (use --help for usage)", self.name, self.version);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
