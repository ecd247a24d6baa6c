use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{self, DatabaseConfig};
use crate::database::{DatabaseManager, PgStore};
use crate::seed::{seed_demo_data, COORDINATOR_EMAIL, DEMO_PASSWORD, MANAGER_EMAIL, SUPERVISOR_EMAIL};

async fn connect(database_url: Option<String>) -> anyhow::Result<PgPool> {
    let database = DatabaseConfig {
        url: database_url.or_else(|| config::config().database.url.clone()),
        ..config::config().database.clone()
    };
    DatabaseManager::connect(&database)
        .await
        .context("connecting to the database")
}

pub async fn migrate(database_url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect(database_url).await?;
    DatabaseManager::migrate(&pool).await?;
    output_success(output_format, "Migrations applied", None)
}

pub async fn seed(database_url: Option<String>, migrate: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect(database_url).await?;
    if migrate {
        DatabaseManager::migrate(&pool).await?;
    }

    let store = PgStore::new(pool);
    let demo = seed_demo_data(&store, crate::config::config().security.password_hash_cost)
        .await
        .context("seeding demo data (already seeded?)")?;

    if output_format == OutputFormat::Text {
        println!("Demo users (password: {}):", DEMO_PASSWORD);
        for (email, role) in [
            (COORDINATOR_EMAIL, "Permit Coordinator"),
            (SUPERVISOR_EMAIL, "Field Supervisor"),
            (MANAGER_EMAIL, "Compliance Manager"),
        ] {
            println!("  {:<32} {}", email, role);
        }
    }

    output_success(
        output_format,
        "Demo data seeded",
        Some(json!({
            "organizationId": demo.organization_id,
            "tickets": [demo.fiber_ticket_id, demo.water_ticket_id],
            "permitId": demo.permit_id,
        })),
    )
}

pub fn hash_password(password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let hash = crate::auth::hash_password(password, crate::config::config().security.password_hash_cost)?;
    match output_format {
        OutputFormat::Json => output_success(output_format, "Password hashed", Some(json!({ "hash": hash }))),
        OutputFormat::Text => {
            println!("{}", hash);
            Ok(())
        }
    }
}
