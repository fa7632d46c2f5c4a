use anyhow::Result;
use clap::Parser;
use style_guard::cli::commands::{CheckCommand, Command, ConfigCommand, ReplayCommand};
use style_guard::cli::{Cli, Commands};
use style_guard::{init_telemetry, StyleGuardConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StyleGuardConfig::load(cli.config.as_deref())?;
    if cli.suppress_feedback {
        config.suppress_feedback = true;
    }
    init_telemetry(&config.logging)?;

    match cli.command {
        Commands::Check { prs } => CheckCommand::new(config, prs).execute().await,
        Commands::Replay { payload } => ReplayCommand::new(config, payload).execute().await,
        Commands::Config { check } => ConfigCommand::new(config, check).execute().await,
    }
}
