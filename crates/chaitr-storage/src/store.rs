use async_trait::async_trait;
use chaitr_core::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Asynchronous string key-value medium backing every persisted slot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw record stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Durably replace the record stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!("MemoryStore set '{}' ({} bytes)", key, value.len());
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("key", "\"value\"").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("\"value\""));

        store.set("key", "\"other\"").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("\"other\""));
    }

    #[tokio::test]
    async fn test_memory_store_seeded() {
        let store = MemoryStore::with_entries([("a", "1"), ("b", "2")]);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }
}
