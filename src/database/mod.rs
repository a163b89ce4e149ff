pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{PreferenceStore, StoreError};

use crate::config::DatabaseConfig;

/// URI scheme that selects the in-process store instead of PostgreSQL.
pub const MEMORY_SCHEME: &str = "memory";

/// Open the store named by the configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn PreferenceStore>, StoreError> {
    if config.uri.starts_with(&format!("{}:", MEMORY_SCHEME)) {
        tracing::info!("Using in-memory preference store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(config).await?;
    Ok(Arc::new(store))
}
