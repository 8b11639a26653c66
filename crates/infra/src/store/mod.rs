//! Store adapters.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use estate_core::Store;

use crate::config::DatabaseConfig;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Open the configured store: Postgres when a database is configured,
/// otherwise a fresh in-memory store.
pub async fn open(database: Option<&DatabaseConfig>) -> anyhow::Result<Arc<dyn Store>> {
    match database {
        Some(db) => {
            let store = PostgresStore::connect(&db.url, db.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            info!(max_connections = db.max_connections, "using postgres store");
            Ok(Arc::new(store))
        }
        None => {
            info!("no database configured; using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
