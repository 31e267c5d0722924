//! CLI parse: clap types for specforge. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// specforge - dependency-aware incremental generation from specifications
#[derive(Parser, Debug)]
#[command(name = "specforge")]
#[command(about = "Plan, diff and scope incremental regeneration from project specifications")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where specforge.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the change report between two specification snapshots
    Diff {
        old: PathBuf,
        new: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List files that must regenerate, using the state recorded in an output directory
    Affected {
        old: PathBuf,
        new: PathBuf,
        /// Output directory holding the incremental state
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the filtered context a target file would receive
    Context {
        spec: PathBuf,
        /// Target file path, relative to the output root
        file: String,
        /// Task input parameters as JSON (e.g. '{"entities": ["User"]}')
        #[arg(long)]
        task_params: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate a specification
    Validate { spec: PathBuf },
    /// Remove the incremental state recorded in an output directory
    ClearState {
        #[arg(long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_context_with_params() {
        let cli = Cli::try_parse_from([
            "specforge",
            "--log-level",
            "debug",
            "context",
            "spec.json",
            "models/user.go",
            "--task-params",
            r#"{"entity":"User"}"#,
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Context {
                file,
                task_params,
                format,
                ..
            } => {
                assert_eq!(file, "models/user.go");
                assert!(task_params.is_some());
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn affected_requires_output() {
        assert!(Cli::try_parse_from(["specforge", "affected", "a.json", "b.json"]).is_err());
    }
}
