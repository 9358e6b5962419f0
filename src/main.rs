use std::process::ExitCode;

use portfolio_admin::config::Config;
use portfolio_admin::server::{self, state::AppState};
use portfolio_admin::state::library::Library;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading configuration...");
    let config = Config::load()?;

    // The server cannot function without its catalog
    let library = Library::open(&config.database_path)?;
    let counts = library.counts()?;
    info!(
        "Catalog ready: {} projects, {} clients, {} contacts, {} subscribers",
        counts.projects, counts.clients, counts.contacts, counts.subscriptions
    );

    server::serve(AppState::new(config, library)).await?;
    Ok(())
}
