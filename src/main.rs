//! Haggler CLI binary

use anyhow::Context;
use clap::Parser;
use haggler::cli::{Cli, Commands, ConfigAction, HagglerApp};
use haggler::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let app = HagglerApp::new(config).context("invalid engine configuration")?;

    match cli.command {
        Commands::Open { negotiation } => {
            let decision = app.open(&negotiation)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }

        Commands::Simulate { negotiation, quotes } => {
            tracing::info!("Simulating {} seller quotes", quotes.len());
            let output = app.simulate(&negotiation, &quotes)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Run { negotiation } => {
            tracing::info!("Reading seller quotes from stdin");
            app.run(&negotiation, tokio::io::stdin(), tokio::io::stdout())
                .await
                .context("negotiation run failed")?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", app.config_toml()?),
        },
    }

    Ok(())
}
