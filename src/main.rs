use clap::Parser;
use screenshot_gallery::config::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,screenshot_gallery=debug")))
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing::info!("Starting screenshot gallery v{}", env!("CARGO_PKG_VERSION"));
    screenshot_gallery::run(config).await
}
