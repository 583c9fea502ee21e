use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::info;

use crate::repo::{MemoryStore, MySqlStore, Store};

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// MySQL when a URL is configured, otherwise the in-memory store.
pub async fn init_store(database_url: Option<&str>) -> Result<Arc<dyn Store>> {
    match database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            info!("Using MySQL store");
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
