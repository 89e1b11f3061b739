//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Inspect, validate, convert and crawl spatial networks.
#[derive(Parser, Debug)]
#[command(name = "spannet", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "SPANNET_CONFIG", global = true)]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a network and print statistics.
    Info {
        /// Network file (`.xml` or `.json`).
        file: String,

        /// Read the file as a legacy topology document.
        #[arg(long)]
        legacy: bool,

        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check a network for structural problems.
    Validate {
        /// Network file (`.xml` or `.json`).
        file: String,

        /// Read the file as a legacy topology document.
        #[arg(long)]
        legacy: bool,
    },

    /// Convert a network between formats.
    Convert {
        /// Input file.
        input: String,

        /// Output file; the format follows the extension.
        output: String,

        /// Read the input as a legacy topology document.
        #[arg(long)]
        legacy: bool,

        /// Create the output directory if missing.
        #[arg(long)]
        create_dir: bool,
    },

    /// Crawl a legacy topology for chains and report overlaps.
    Crawl {
        /// Legacy topology document.
        file: String,

        /// Minimum continuation: candidates need dot(incoming, next) below -limit.
        #[arg(short, long)]
        angle_limit: Option<f64>,

        /// Seed for choosing between equally valid continuations.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Shortest shared run reported as an overlap.
        #[arg(short, long)]
        min_overlap: Option<usize>,

        /// Classify valence-3 nodes as branching before crawling.
        #[arg(short, long)]
        branching: bool,

        /// Write the rebuilt topology to this legacy document.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_default() {
        let args = CliArgs::parse_from(["spannet"]);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_args_global_flags_after_command() {
        let args = CliArgs::parse_from(["spannet", "info", "net.xml", "--verbose"]);
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_args_config() {
        let args = CliArgs::parse_from(["spannet", "--config", "/path/to/config.toml"]);
        assert_eq!(args.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_info_command() {
        let args = CliArgs::parse_from(["spannet", "info", "net.json"]);
        match args.command {
            Some(Command::Info { file, legacy, json }) => {
                assert_eq!(file, "net.json");
                assert!(!legacy);
                assert!(!json);
            }
            _ => panic!("Expected Info command"),
        }
    }

    #[test]
    fn test_validate_legacy() {
        let args = CliArgs::parse_from(["spannet", "validate", "old.xml", "--legacy"]);
        match args.command {
            Some(Command::Validate { file, legacy }) => {
                assert_eq!(file, "old.xml");
                assert!(legacy);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_convert_command() {
        let args = CliArgs::parse_from([
            "spannet",
            "convert",
            "old.xml",
            "out/new.json",
            "--legacy",
            "--create-dir",
        ]);
        match args.command {
            Some(Command::Convert {
                input,
                output,
                legacy,
                create_dir,
            }) => {
                assert_eq!(input, "old.xml");
                assert_eq!(output, "out/new.json");
                assert!(legacy);
                assert!(create_dir);
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn test_crawl_command() {
        let args = CliArgs::parse_from([
            "spannet",
            "crawl",
            "old.xml",
            "--angle-limit",
            "0.7",
            "--seed",
            "42",
            "--min-overlap",
            "3",
            "--branching",
        ]);
        match args.command {
            Some(Command::Crawl {
                file,
                angle_limit,
                seed,
                min_overlap,
                branching,
                output,
            }) => {
                assert_eq!(file, "old.xml");
                assert_eq!(angle_limit, Some(0.7));
                assert_eq!(seed, Some(42));
                assert_eq!(min_overlap, Some(3));
                assert!(branching);
                assert!(output.is_none());
            }
            _ => panic!("Expected Crawl command"),
        }
    }

    #[test]
    fn test_crawl_defaults_left_to_config() {
        let args = CliArgs::parse_from(["spannet", "crawl", "old.xml"]);
        match args.command {
            Some(Command::Crawl {
                angle_limit,
                seed,
                min_overlap,
                ..
            }) => {
                assert!(angle_limit.is_none());
                assert!(seed.is_none());
                assert!(min_overlap.is_none());
            }
            _ => panic!("Expected Crawl command"),
        }
    }

    #[test]
    fn test_version_command() {
        let args = CliArgs::parse_from(["spannet", "version"]);
        assert!(matches!(args.command, Some(Command::Version)));
    }

    // ------------------------------------------------------------------------
    // Config command tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_path_command() {
        let args = CliArgs::parse_from(["spannet", "config", "path"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Path
            }))
        ));
    }

    #[test]
    fn test_config_show_command() {
        let args = CliArgs::parse_from(["spannet", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Show
            }))
        ));
    }

    #[test]
    fn test_config_init_command() {
        let args = CliArgs::parse_from([
            "spannet", "config", "init", "--file", "c.toml", "--force",
        ]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Init { file, force },
            })) => {
                assert_eq!(file.as_deref(), Some("c.toml"));
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
