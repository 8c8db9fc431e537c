use api_moduled::cli::{self, Cli};
use api_moduled::config::AppConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so local runs pick up AMLD_* settings
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    if let Err(e) = cli::run(cli, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
