use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::config::DatabaseSettings;

pub type DbPool = Pool<Postgres>;

/// Schema for `taxi_trips` and `trip_aggregations`, embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(settings: &DatabaseSettings) -> Result<DbPool> {
    info!(
        url = %settings.redacted_url(),
        max_connections = settings.max_connections,
        "Connecting to trip database"
    );
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&settings.url)
        .await
        .with_context(|| format!("could not reach trip database at {}", settings.redacted_url()))
}

/// Applies any embedded migration the database has not seen yet.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!(known = MIGRATOR.iter().count(), "Applying trip schema migrations");
    MIGRATOR
        .run(pool)
        .await
        .context("trip schema migration failed")
}
