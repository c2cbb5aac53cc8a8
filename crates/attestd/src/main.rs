use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use attest_service::{spawn_engine, CommandExtractor, Config, Service};
use attest_store_sqlite::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("attestd starting");

    let config = Config::from_env()?;

    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
    }
    let store = SqliteStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;
    tracing::info!(path = %config.db_path.display(), "store opened");

    let extractor = CommandExtractor::new(config.extractor_cmd.clone());
    let engine = spawn_engine(extractor, Duration::from_secs(config.extract_timeout_secs));
    tracing::info!(
        cmd = %config.extractor_cmd,
        timeout_secs = config.extract_timeout_secs,
        "extractor engine spawned"
    );

    let _service = Service::new(store, engine, &config);
    tracing::info!(
        threshold = config.similarity_threshold,
        session_lifetime_secs = config.session_lifetime_secs,
        "attestd ready"
    );

    // TODO: expose the service over an IPC/HTTP transport

    tokio::signal::ctrl_c().await?;
    tracing::info!("attestd shutting down");

    Ok(())
}
