use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use utility_permit_api::config;
use utility_permit_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use utility_permit_api::jobs::{workers::default_workers, JobQueue};
use utility_permit_api::{build_router, is_development, seed, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config().clone();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate().map_err(anyhow::Error::msg)?;
    info!("Starting Utility Permit API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match config.database.url {
        Some(_) => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            let store = MemoryStore::new();
            if is_development!() {
                let demo = seed::seed_demo_data(&store, config.security.password_hash_cost)
                    .await
                    .context("seeding demo data")?;
                info!(
                    "Demo organization {} ready; log in as {} / {}",
                    demo.organization_id,
                    seed::COORDINATOR_EMAIL,
                    seed::DEMO_PASSWORD
                );
            }
            Arc::new(store)
        }
    };

    let jobs = JobQueue::builder(&config.queue)
        .workers(default_workers())
        .start();

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(AppState::new(store, jobs, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Utility Permit API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
