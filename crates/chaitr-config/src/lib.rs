use chaitr_core::{ChaitrError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub mod connection;
pub mod env_substitution;

pub use connection::{validate, ConnectionSettings, FieldErrors, RawSettings, DEFAULT_PORT};
pub use env_substitution::substitute_env_vars;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    #[serde(default = "default_settings_key")]
    pub settings_key: String,
    #[serde(default = "default_logs_key")]
    pub logs_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
}

impl AppConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ChaitrError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: AppConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ChaitrError::ConfigError(format!("Failed to parse YAML: {}", e)))?;

        config.expand_env_vars()?;
        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<()> {
        if let Ok(home) = env::var("CHAITR_HOME") {
            self.storage.dir = PathBuf::from(home);
            return Ok(());
        }
        let dir = self.storage.dir.to_string_lossy().into_owned();
        self.storage.dir = PathBuf::from(substitute_env_vars(&dir)?);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let keys = [
            ("history_key", &self.storage.history_key),
            ("settings_key", &self.storage.settings_key),
            ("logs_key", &self.storage.logs_key),
        ];
        for (name, key) in &keys {
            if key.trim().is_empty() {
                return Err(ChaitrError::ConfigError(format!("storage.{} cannot be empty", name)));
            }
        }
        if keys[0].1 == keys[1].1 || keys[0].1 == keys[2].1 || keys[1].1 == keys[2].1 {
            return Err(ChaitrError::ConfigError("Storage keys must be distinct".into()));
        }
        if self.client.user_name.is_empty() || self.client.assistant_name.is_empty() {
            return Err(ChaitrError::ConfigError("Author names cannot be empty".into()));
        }
        if self.client.timeout_secs == Some(0) {
            return Err(ChaitrError::ConfigError("client.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chaitr")
            .join("config.yaml")
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            history_key: default_history_key(),
            settings_key: default_settings_key(),
            logs_key: default_logs_key(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_name: default_user_name(),
            assistant_name: default_assistant_name(),
        }
    }
}

fn default_history_key() -> String { "chaitr_messages".to_string() }
fn default_settings_key() -> String { "chaitr_settings".to_string() }
fn default_logs_key() -> String { "chaitr_errors".to_string() }
fn default_user_name() -> String { "You".to_string() }
fn default_assistant_name() -> String { "Chaitr".to_string() }

fn default_storage_dir() -> PathBuf {
    env::var("CHAITR_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .map(|p| p.join("chaitr"))
                .unwrap_or_else(|| PathBuf::from("./.chaitr"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
storage:
  dir: /tmp/chaitr-test
  history_key: history
client:
  timeout_secs: 30
  assistant_name: Bot
"#;

        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.storage.history_key, "history");
        assert_eq!(config.storage.settings_key, "chaitr_settings");
        assert_eq!(config.storage.logs_key, "chaitr_errors");
        assert_eq!(config.client.timeout_secs, Some(30));
        assert_eq!(config.client.user_name, "You");
        assert_eq!(config.client.assistant_name, "Bot");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.storage.history_key, "chaitr_messages");
        assert_eq!(config.client.timeout_secs, None);
    }

    #[test]
    fn test_validation() {
        let yaml = r#"
storage:
  history_key: same
  settings_key: same
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());

        let yaml = r#"
storage:
  logs_key: ""
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());

        let yaml = r#"
client:
  timeout_secs: 0
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "client:\n  user_name: Ada").unwrap();

        let config = AppConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.client.user_name, "Ada");
    }
}
