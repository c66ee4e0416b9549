//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aurora stack: plans a VPC and an Aurora-PostgreSQL cluster and submits
/// the declarations to a provisioning engine.
#[derive(Parser, Debug)]
#[command(name = "aurora-stack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the stack configuration file.
    #[arg(short, long, global = true, env = "AURORA_STACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter configuration.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the stack configuration.
    Validate {
        /// Show warnings as well as errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List the availability zones a plan would use.
    Zones,

    /// Derive the declarations without submitting them.
    Plan {
        /// Show every declaration and its properties.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Submit the declarations to the configured engine.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the manifest of the last apply.
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from(["aurora-stack", "--output", "json", "plan", "--detailed"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Plan { detailed: true }));
    }

    #[test]
    fn test_parse_apply_with_config() {
        let cli = Cli::try_parse_from(["aurora-stack", "apply", "-y", "--config", "prod.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Apply { yes: true }));
        assert_eq!(cli.config, Some(PathBuf::from("prod.yaml")));
    }

    #[test]
    fn test_destroy_is_not_a_command() {
        assert!(Cli::try_parse_from(["aurora-stack", "destroy"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
