//! Engine Maintenance - Main Entry Point
//!
//! CLI for registering data, preparing splits, training and predicting.

use clap::Parser;
use engine_maintenance::cli::{run, Cli};
use engine_maintenance::Settings;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engine_maintenance=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    run(cli, &settings)
}
