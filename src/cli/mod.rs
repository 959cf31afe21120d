// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// strata-applier - DDL statement construction and execution
///
/// Turns schema differences into DDL statements and runs them directly
/// or through operator-configured wrapper commands.
#[derive(Parser, Debug)]
#[command(name = "strata-applier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Apply schema differences to MySQL and MariaDB servers")]
#[command(long_about = "strata-applier - DDL statement construction and execution

Reads schema differences from a YAML file, renders each into a DDL statement
for the configured environment, and either executes it over a database
connection or hands it to an external tool such as pt-online-schema-change
via the ddl-wrapper / alter-wrapper templates.")]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
  Preview statements:   strata-applier plan --env production --diffs diffs.yaml
  Apply statements:     strata-applier apply --env production --diffs diffs.yaml

For detailed help on each command, use: strata-applier <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the statements that would be executed
    ///
    /// Builds a statement for every difference and prints it without touching
    /// the database. Wrapped statements are shown as `\! <command>`.
    ///
    /// EXAMPLES:
    ///   strata-applier plan --env production --diffs diffs.yaml
    Plan {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// YAML file containing differences per schema
        #[arg(short, long, value_name = "FILE")]
        diffs: PathBuf,

        /// Allow unsafe changes (DROP TABLE, DROP COLUMN, ...)
        #[arg(long)]
        allow_unsafe: bool,
    },

    /// Execute the statements
    ///
    /// Statements run in file order within a schema; schemas run concurrently.
    ///
    /// EXAMPLES:
    ///   strata-applier apply --env production --diffs diffs.yaml
    ///
    ///   # Keep going after a failed statement
    ///   strata-applier apply --env staging --diffs diffs.yaml --continue-on-error
    Apply {
        /// Target environment
        #[arg(short, long, value_name = "ENV", default_value = "development")]
        env: String,

        /// YAML file containing differences per schema
        #[arg(short, long, value_name = "FILE")]
        diffs: PathBuf,

        /// Allow unsafe changes (DROP TABLE, DROP COLUMN, ...)
        #[arg(long)]
        allow_unsafe: bool,

        /// Continue with the remaining statements of a schema after a failure
        #[arg(long)]
        continue_on_error: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_command() {
        let cli = Cli::try_parse_from([
            "strata-applier",
            "--format",
            "json",
            "plan",
            "--env",
            "production",
            "--diffs",
            "diffs.yaml",
        ])
        .unwrap();

        assert!(matches!(cli.format, OutputFormat::Json));
        match cli.command {
            Commands::Plan {
                env,
                diffs,
                allow_unsafe,
            } => {
                assert_eq!(env, "production");
                assert_eq!(diffs, PathBuf::from("diffs.yaml"));
                assert!(!allow_unsafe);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_apply_command_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "strata-applier",
            "apply",
            "--diffs",
            "d.yaml",
            "--allow-unsafe",
            "--continue-on-error",
            "--verbose",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        match cli.command {
            Commands::Apply {
                env,
                allow_unsafe,
                continue_on_error,
                ..
            } => {
                assert_eq!(env, "development");
                assert!(allow_unsafe);
                assert!(continue_on_error);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_diffs_is_required() {
        assert!(Cli::try_parse_from(["strata-applier", "plan"]).is_err());
    }
}
