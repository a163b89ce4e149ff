use clap::Parser;
use tracing_subscriber::EnvFilter;

use notify_prefs::cli::{filter_directive, Cli};
use notify_prefs::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, AUTH_SIGN_KEY, etc. are picked up
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.apply(config::config().clone());

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.log.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting notify-prefs in {:?} mode", config.environment);
    tracing::debug!(?config, "Loaded configuration");

    server::run(&config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
