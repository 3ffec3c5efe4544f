use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::store::PgMatchStore;

/// Creates a PostgreSQL pool and makes sure the matcher tables exist.
pub async fn connect_store(database_url: &str) -> Result<PgMatchStore> {
    info!("Connecting to PostgreSQL...");

    let pool: PgPool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("could not connect to PostgreSQL")?;
    info!("PostgreSQL connection pool established");

    let store = PgMatchStore::new(pool);
    store
        .init_schema()
        .await
        .context("could not create matcher schema")?;
    Ok(store)
}
