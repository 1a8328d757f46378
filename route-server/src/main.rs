//! route-server: Read-On-Route catalog, order and payment backend

use route_server::core::BoxError;
use route_server::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = route_server::init_logger(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    );

    tracing::info!(
        environment = %config.environment,
        port = config.http_port,
        database = %config.database_path,
        "Starting route-server"
    );

    Server::new(config).run().await?;

    Ok(())
}
