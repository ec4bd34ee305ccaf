use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Text of the notice appended when a send is attempted without usable settings.
pub const SETTINGS_MISSING_NOTICE: &str = "Error: IP Address or Port is not set.";

/// Text of the notice appended when the backend could not be reached.
pub const BACKEND_UNREACHABLE_NOTICE: &str = "Error: Couldn't connect to backend.";

/// Identity attached to every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The person typing at this client.
    pub fn user(name: impl Into<String>) -> Self {
        Self::new("1", name)
    }

    /// The remote backend, also used to sign locally synthesized notices.
    pub fn assistant(name: impl Into<String>) -> Self {
        Self::new("2", name)
    }
}

/// One conversation turn. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    #[serde(default)]
    pub is_system: bool,
}

impl Message {
    pub fn new(text: impl Into<String>, author: Author) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.into(),
            created_at: Utc::now(),
            author,
            is_system: false,
        }
    }

    /// A notice synthesized locally to report an error inline with the chat.
    pub fn system(text: impl Into<String>, author: Author) -> Self {
        Self {
            is_system: true,
            ..Self::new(text, author)
        }
    }
}

#[derive(Error, Debug)]
pub enum ChaitrError {
    #[error("IP address or port is not configured")]
    ConfigurationMissing,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Backend reported an error: {0}")]
    ServerReported(String),

    #[error("Failed to write '{key}': {message}")]
    PersistenceWrite { key: String, message: String },

    #[error("Failed to read '{key}': {message}")]
    PersistenceRead { key: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChaitrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let author = Author::user("You");
        let first = Message::new("a", author.clone());
        let second = Message::new("b", author);
        assert_ne!(first.id, second.id);
        assert!(!first.is_system);
    }

    #[test]
    fn test_system_message_flag() {
        let notice = Message::system(BACKEND_UNREACHABLE_NOTICE, Author::assistant("Chaitr"));
        assert!(notice.is_system);
        assert_eq!(notice.author.id, "2");
        assert_eq!(notice.text, "Error: Couldn't connect to backend.");
    }

    #[test]
    fn test_message_json_shape() {
        let message = Message::new("hello", Author::user("You"));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["isSystem"], false);
        assert_eq!(json["author"]["id"], "1");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_missing_system_flag_defaults_to_false() {
        let json = r#"{
            "id": "abc",
            "text": "hi",
            "createdAt": "2024-05-01T10:00:00Z",
            "author": {"id": "2", "name": "Chaitr"}
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(!message.is_system);
        assert_eq!(message.author.name, "Chaitr");
    }
}
