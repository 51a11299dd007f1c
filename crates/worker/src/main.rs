use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidpulse_core::engine::PerformanceEngine;
use vidpulse_db::PgStores;
use vidpulse_worker::config::WorkerConfig;
use vidpulse_worker::reclassify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;
    init_tracing(config.json_logs);

    config
        .engine
        .thresholds
        .validate()
        .context("Invalid tier thresholds")?;

    tracing::info!(
        batch_size = config.batch_size,
        scaling = ?config.engine.scaling,
        cache_max_age_hours = config.engine.cache_max_age_hours,
        "Reclassification worker starting"
    );

    let pool = vidpulse_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    vidpulse_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    vidpulse_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    let stores = PgStores::new(pool).into_stores();
    let videos = stores.videos.clone();
    let engine = PerformanceEngine::new(stores, config.engine.clone());

    let summary = reclassify::run_once(&engine, videos.as_ref(), config.batch_size).await?;
    tracing::info!(
        persisted = summary.persisted,
        failed = summary.failed,
        "Reclassification worker done"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vidpulse_worker=debug,vidpulse_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
