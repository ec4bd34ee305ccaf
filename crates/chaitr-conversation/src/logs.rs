use chaitr_storage::{KeyValueStore, StoredValue};
use serde_json::Value;
use std::sync::Arc;

/// Shown when the log slot holds no records.
pub const NO_LOGS_NOTICE: &str = "No logs available";

/// Read-only view of the stored error log records.
pub struct ErrorLog {
    slot: StoredValue<Vec<Value>>,
}

impl ErrorLog {
    /// Open the log slot seeded with an empty list.
    ///
    /// A record that is not a JSON array is ignored and the seed stays.
    pub async fn open(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let slot = StoredValue::open(store, key, Some(Vec::new()));
        slot.loaded().await;
        Self { slot }
    }

    pub fn entries(&self) -> Vec<Value> {
        self.slot.value().unwrap_or_default()
    }

    /// One pretty-printed block per record, or the empty notice.
    pub fn render(&self) -> Vec<String> {
        let entries = self.entries();
        if entries.is_empty() {
            return vec![NO_LOGS_NOTICE.to_string()];
        }

        entries
            .iter()
            .map(|entry| serde_json::to_string_pretty(entry).unwrap_or_else(|_| entry.to_string()))
            .collect()
    }
}
