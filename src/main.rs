#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use private_toot_remover::Config;
use private_toot_remover::cli::Cli;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // This prevents the error: "could not automatically determine the process-level CryptoProvider"
    // when both aws-lc-rs and ring features are available (or neither is explicitly selected).
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Values from a local .env file behave like real environment variables.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let level_name = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    let level = Level::from_str(level_name).unwrap_or(Level::INFO);

    // Initialize logging
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    private_toot_remover::app::dispatch(cli, config).await
}
