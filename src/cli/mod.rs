use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "style-guard")]
#[command(about = "Code style verification for pull requests")]
#[command(long_about = "style-guard runs the project's formatter over the files a pull request \
                       changes, publishes a commit status, and links a ready-to-apply patch when \
                       the PR does not conform. Jobs run one at a time in a single shared workspace.")]
pub struct Cli {
    /// Configuration file (defaults to ./style-guard.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verify only; never publish statuses or patches
    #[arg(long, global = true, help = "Run checks without publishing anything to GitHub")]
    pub suppress_feedback: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check one or more pull requests by number
    Check {
        /// Pull request numbers, processed in the order given
        #[arg(required = true, value_name = "PR")]
        prs: Vec<u64>,
    },
    /// Re-run a saved webhook payload (e.g. last_payload.json)
    Replay {
        /// JSON file holding a pull_request webhook payload or a bare pull request
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,
    },
    /// Print the effective configuration
    Config {
        /// Also check credentials and the workspace without starting any job
        #[arg(long, help = "Validate the configuration and report problems")]
        check: bool,
    },
}
