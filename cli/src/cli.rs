//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xpilot_domain::Complexity;

/// CLI arguments for xpilot
#[derive(Parser, Debug)]
#[command(name = "xpilot")]
#[command(author, version, about = "Autonomous coding assistant")]
#[command(long_about = r#"
xpilot plans projects into epics and tasks and reviews proposed file changes
hunk by hunk with an LLM.

Configuration files are loaded from (lowest to highest priority):
1. ~/.config/xpilot/config.toml   Global config
2. ./xpilot.toml or ./.xpilot.toml  Project-level config
3. --config <path>                 Explicit config file
4. XPILOT_* environment variables   e.g. XPILOT_LLM__MODEL=gpt-4o-mini

Example:
  xpilot check
  xpilot plan "A CLI that converts CSV files to JSON" --state-out state.json
  xpilot review src/main.rs --new proposed/main.rs --state state.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Ignore configuration files and environment variables
    #[arg(long, global = true, conflicts_with = "config")]
    pub no_config: bool,

    /// Also write diagnostics to a daily-rotated file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Do not stream responses to the terminal
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Never ask whether to keep retrying after API errors
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the configured provider answers
    Check,

    /// Create a development plan, or update the current epic of an existing one
    Plan {
        /// What the project should do (ignored with --state)
        description: Option<String>,

        /// Estimated project complexity
        #[arg(long, default_value_t = Complexity::Moderate)]
        complexity: Complexity,

        /// Use a built-in example plan instead of asking the LLM
        #[arg(long, value_name = "NAME")]
        example: Option<String>,

        /// Continue from a saved project state
        #[arg(long, value_name = "PATH")]
        state: Option<PathBuf>,

        /// Write the resulting project state as JSON
        #[arg(long, value_name = "PATH")]
        state_out: Option<PathBuf>,
    },

    /// Review a proposed change to a file
    Review {
        /// File being changed, relative to --root
        path: String,

        /// File holding the proposed new content
        #[arg(long, value_name = "PATH")]
        new: PathBuf,

        /// File holding the old content (defaults to the current file under --root)
        #[arg(long, value_name = "PATH")]
        old: Option<PathBuf>,

        /// What the change is supposed to do
        #[arg(long, default_value = "")]
        instructions: String,

        /// Coding attempt number for this change
        #[arg(long, default_value_t = 1)]
        attempt: u32,

        /// Project root accepted changes are written under
        #[arg(long, value_name = "DIR", default_value = ".")]
        root: PathBuf,

        /// Project state giving the task context; updated in place
        #[arg(long, value_name = "PATH")]
        state: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from([
            "xpilot",
            "-vv",
            "plan",
            "A todo app",
            "--complexity",
            "hard",
            "--state-out",
            "state.json",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Plan {
                description,
                complexity,
                state_out,
                ..
            } => {
                assert_eq!(description.as_deref(), Some("A todo app"));
                assert_eq!(complexity, Complexity::Hard);
                assert_eq!(state_out, Some(PathBuf::from("state.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_review_defaults() {
        let cli = Cli::parse_from(["xpilot", "review", "src/lib.rs", "--new", "proposed.rs"]);
        match cli.command {
            Command::Review {
                path,
                attempt,
                root,
                old,
                ..
            } => {
                assert_eq!(path, "src/lib.rs");
                assert_eq!(attempt, 1);
                assert_eq!(root, PathBuf::from("."));
                assert!(old.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
