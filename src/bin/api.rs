use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_ledger::{api::start_server, config::AppConfig, VoiceLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Voice Ledger - API Server");
    info!("Port: {}", config.port);
    info!("Records: {}", config.store.csv_path.display());

    let ledger = Arc::new(VoiceLedger::from_config(&config)?);

    info!("Ledger initialized, starting API server");

    start_server(ledger, config.port).await?;

    Ok(())
}
