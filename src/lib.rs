pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod server;
pub mod validation;

use config::AppConfig;
use error::AppError;

/// Open the store and serve the HTTP API until shutdown.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Vectra prompt engine v{}", env!("CARGO_PKG_VERSION"));

    let pool = db::init_db(&config.data_dir)?;
    tracing::info!("Database pool ready (max_size=8)");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vectra-worker")
        .build()?;

    runtime.block_on(server::serve(&config, pool))
}
