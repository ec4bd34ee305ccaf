use chaitr_config::{validate, ConnectionSettings, FieldErrors, RawSettings, DEFAULT_PORT};
use chaitr_core::ChaitrError;
use chaitr_storage::{KeyValueStore, StoredValue};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings: {0}")]
    Invalid(#[from] FieldErrors),

    #[error(transparent)]
    Storage(#[from] ChaitrError),
}

/// Edits the stored connection settings. Only validated values are written.
pub struct SettingsEditor {
    slot: StoredValue<ConnectionSettings>,
}

impl SettingsEditor {
    pub async fn open(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let slot = StoredValue::open(store, key, None);
        slot.loaded().await;
        Self { slot }
    }

    pub fn current(&self) -> Option<ConnectionSettings> {
        self.slot.value()
    }

    /// Values to pre-fill the form with: the stored ones, or blanks and the default port.
    pub fn form_defaults(&self) -> RawSettings {
        let current = self.slot.value();
        let ip_address = current
            .as_ref()
            .map(|s| s.ip_address.clone())
            .unwrap_or_default();
        let port = current
            .as_ref()
            .map(|s| s.port)
            .filter(|port| *port != 0)
            .unwrap_or(DEFAULT_PORT);

        RawSettings::new(ip_address, port.to_string())
    }

    pub async fn submit(&self, raw: &RawSettings) -> Result<ConnectionSettings, SettingsError> {
        let settings = validate(raw)?;
        self.slot.save(settings.clone()).await?;
        info!("Saved connection settings for {}:{}", settings.ip_address, settings.port);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaitr_storage::MemoryStore;

    const KEY: &str = "chaitr_settings";

    #[tokio::test]
    async fn test_form_defaults_without_record() {
        let editor = SettingsEditor::open(Arc::new(MemoryStore::new()), KEY).await;
        assert_eq!(editor.current(), None);
        assert_eq!(editor.form_defaults(), RawSettings::new("", "3000"));
    }

    #[tokio::test]
    async fn test_form_defaults_from_record() {
        let store = MemoryStore::with_entries([(KEY, r#"{"ipAddress":"10.0.0.12","port":8080}"#)]);
        let editor = SettingsEditor::open(Arc::new(store), KEY).await;
        assert_eq!(editor.form_defaults(), RawSettings::new("10.0.0.12", "8080"));
    }

    #[tokio::test]
    async fn test_rejected_ports_are_never_written() {
        let store = Arc::new(MemoryStore::new());
        let editor = SettingsEditor::open(store.clone(), KEY).await;

        for port in ["0", "65536"] {
            let err = editor
                .submit(&RawSettings::new("192.168.0.5", port))
                .await
                .unwrap_err();
            assert!(matches!(err, SettingsError::Invalid(_)));
        }
        assert_eq!(store.get(KEY).await.unwrap(), None);
        assert_eq!(editor.current(), None);
    }

    #[tokio::test]
    async fn test_boundary_ports_are_saved() {
        let store = Arc::new(MemoryStore::new());
        let editor = SettingsEditor::open(store.clone(), KEY).await;

        for (port, expected) in [("1", 1u16), ("65535", 65535)] {
            let saved = editor
                .submit(&RawSettings::new("192.168.0.5", port))
                .await
                .unwrap();
            assert_eq!(saved.port, expected);

            let raw = store.get(KEY).await.unwrap().unwrap();
            let stored: ConnectionSettings = serde_json::from_str(&raw).unwrap();
            assert_eq!(stored, saved);
        }
    }

    #[tokio::test]
    async fn test_invalid_submit_keeps_previous_settings() {
        let store = MemoryStore::with_entries([(KEY, r#"{"ipAddress":"10.0.0.12","port":8080}"#)]);
        let editor = SettingsEditor::open(Arc::new(store), KEY).await;

        assert!(editor.submit(&RawSettings::new("short", "80")).await.is_err());
        assert_eq!(editor.current().map(|s| s.port), Some(8080));
    }
}
