use std::sync::Arc;

use anyhow::{bail, Context, Result};
use baton_core::infrastructure_in_memory::InMemoryStore;
use baton_core::CoordinationStore;

// ─── Storage Backend Selection ──────────────────────────────────────────────

/// Where candidates coordinate, parsed from `--storage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSpec {
    Memory,
    Sqlite(String),
    Redis(String),
}

impl StorageSpec {
    pub fn parse(storage: &str) -> Result<Self> {
        if storage == "memory" {
            Ok(StorageSpec::Memory)
        } else if let Some(path) = storage.strip_prefix("sqlite:") {
            if path.is_empty() {
                bail!("sqlite storage needs a path, e.g. 'sqlite:./leases.db'");
            }
            Ok(StorageSpec::Sqlite(path.to_string()))
        } else if storage.starts_with("redis://") || storage.starts_with("rediss://") {
            Ok(StorageSpec::Redis(storage.to_string()))
        } else {
            bail!(
                "Unknown storage backend: '{storage}'. \
                 Use 'memory', 'sqlite:<path>' or 'redis://host:port'"
            )
        }
    }
}

/// Hands out one store handle per candidate.
///
/// The in-memory store only exists inside this process, so every candidate
/// shares the same instance; the other backends open a fresh connection for
/// each call.
pub struct StoreFactory {
    spec: StorageSpec,
    memory: Arc<InMemoryStore>,
}

impl StoreFactory {
    pub fn new(spec: StorageSpec) -> Self {
        match &spec {
            StorageSpec::Memory => {
                tracing::info!("💾 Storage backend: in-memory (single process only)")
            }
            StorageSpec::Sqlite(path) => tracing::info!("💾 Storage backend: SQLite ({})", path),
            StorageSpec::Redis(url) => tracing::info!("💾 Storage backend: Redis ({})", url),
        }
        Self {
            spec,
            memory: Arc::new(InMemoryStore::new()),
        }
    }

    pub async fn connect(&self) -> Result<Box<dyn CoordinationStore>> {
        match &self.spec {
            StorageSpec::Memory => Ok(Box::new(Arc::clone(&self.memory))),
            StorageSpec::Sqlite(path) => open_sqlite(path),
            StorageSpec::Redis(url) => open_redis(url).await,
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(path: &str) -> Result<Box<dyn CoordinationStore>> {
    let store = baton_core::infrastructure_sqlite::SqliteStore::open(path)
        .with_context(|| format!("Failed to open SQLite database at '{path}'"))?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_path: &str) -> Result<Box<dyn CoordinationStore>> {
    bail!(
        "SQLite storage requested but `sqlite` feature is not enabled. \
         Rebuild with: cargo build --features sqlite"
    )
}

#[cfg(feature = "redis")]
async fn open_redis(url: &str) -> Result<Box<dyn CoordinationStore>> {
    let store = baton_core::infrastructure_redis::RedisStore::connect(url)
        .await
        .with_context(|| format!("Failed to connect to Redis at '{url}'"))?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_url: &str) -> Result<Box<dyn CoordinationStore>> {
    bail!(
        "Redis storage requested but `redis` feature is not enabled. \
         Rebuild with: cargo build --features redis"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_specs() {
        assert_eq!(StorageSpec::parse("memory").unwrap(), StorageSpec::Memory);
        assert_eq!(
            StorageSpec::parse("sqlite:/tmp/leases.db").unwrap(),
            StorageSpec::Sqlite("/tmp/leases.db".into())
        );
        assert_eq!(
            StorageSpec::parse("redis://127.0.0.1:6379").unwrap(),
            StorageSpec::Redis("redis://127.0.0.1:6379".into())
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert!(StorageSpec::parse("sqlite:").is_err());
        assert!(StorageSpec::parse("postgres://db").is_err());
    }

    #[tokio::test]
    async fn test_memory_factory_shares_one_store() {
        let factory = StoreFactory::new(StorageSpec::Memory);
        let a = factory.connect().await.unwrap();
        let b = factory.connect().await.unwrap();
        let ttl = std::time::Duration::from_secs(5);

        assert!(a.set_if_absent("leader", "a", ttl).await.unwrap());
        assert!(!b.set_if_absent("leader", "b", ttl).await.unwrap());
    }
}
