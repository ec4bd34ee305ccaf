//! Connection settings for the remote chat backend and their validation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_ADDRESS_LEN: usize = 7;
pub const DEFAULT_PORT: u16 = 3000;

/// Where the chat backend lives. Only ever persisted after passing [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub ip_address: String,
    pub port: u16,
}

impl ConnectionSettings {
    /// Both an address and a non-zero port are present.
    pub fn is_complete(&self) -> bool {
        !self.ip_address.trim().is_empty() && self.port != 0
    }

    pub fn chat_url(&self) -> String {
        format!("http://{}:{}/chat", self.ip_address, self.port)
    }
}

/// Unvalidated form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub ip_address: Option<String>,
    pub port: Option<String>,
}

impl RawSettings {
    pub fn new(ip_address: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            port: Some(port.into()),
        }
    }
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub ip_address: Vec<String>,
    pub port: Vec<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_empty() && self.port.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self
            .ip_address
            .iter()
            .chain(self.port.iter())
            .map(String::as_str)
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Check raw form input and produce settings only if every field is valid.
pub fn validate(raw: &RawSettings) -> Result<ConnectionSettings, FieldErrors> {
    let mut errors = FieldErrors::default();

    let ip_address = match raw.ip_address.as_deref() {
        None => {
            errors.ip_address.push("IP address is required".to_string());
            None
        }
        Some(address) if address.chars().count() < MIN_ADDRESS_LEN => {
            errors.ip_address.push(format!(
                "IP address must be at least {MIN_ADDRESS_LEN} characters long"
            ));
            None
        }
        Some(address) => Some(address.to_string()),
    };

    let port = match raw.port.as_deref().map(str::trim) {
        None | Some("") => {
            errors.port.push("Port number is required".to_string());
            None
        }
        Some(text) => match text.parse::<i64>() {
            Err(_) => {
                errors.port.push("Port number must be a number".to_string());
                None
            }
            Ok(number) => match u16::try_from(number) {
                Ok(port) if port >= 1 => Some(port),
                _ => {
                    errors
                        .port
                        .push("Port number should be between 1 and 65535".to_string());
                    None
                }
            },
        },
    };

    match (ip_address, port) {
        (Some(ip_address), Some(port)) if errors.is_empty() => {
            Ok(ConnectionSettings { ip_address, port })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_settings() {
        let settings = validate(&RawSettings::new("192.168.1.20", "3000")).unwrap();
        assert_eq!(settings.ip_address, "192.168.1.20");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.chat_url(), "http://192.168.1.20:3000/chat");
    }

    #[test]
    fn test_port_boundaries() {
        for accepted in ["1", "65535"] {
            assert!(validate(&RawSettings::new("10.0.0.1", accepted)).is_ok());
        }
        for rejected in ["0", "65536", "-1"] {
            let errors = validate(&RawSettings::new("10.0.0.1", rejected)).unwrap_err();
            assert_eq!(errors.port, vec!["Port number should be between 1 and 65535"]);
            assert!(errors.ip_address.is_empty());
        }
    }

    #[test]
    fn test_port_must_be_numeric() {
        let errors = validate(&RawSettings::new("10.0.0.1", "http")).unwrap_err();
        assert_eq!(errors.port, vec!["Port number must be a number"]);

        let errors = validate(&RawSettings::new("10.0.0.1", "   ")).unwrap_err();
        assert_eq!(errors.port, vec!["Port number is required"]);
    }

    #[test]
    fn test_short_address() {
        let errors = validate(&RawSettings::new("1.2.3", "80")).unwrap_err();
        assert_eq!(
            errors.ip_address,
            vec!["IP address must be at least 7 characters long"]
        );
        assert!(errors.port.is_empty());
    }

    #[test]
    fn test_all_fields_missing() {
        let errors = validate(&RawSettings::default()).unwrap_err();
        assert_eq!(errors.ip_address, vec!["IP address is required"]);
        assert_eq!(errors.port, vec!["Port number is required"]);
        assert_eq!(
            errors.to_string(),
            "IP address is required; Port number is required"
        );
    }

    #[test]
    fn test_completeness() {
        let mut settings = ConnectionSettings {
            ip_address: "localhost".to_string(),
            port: 8080,
        };
        assert!(settings.is_complete());
        settings.port = 0;
        assert!(!settings.is_complete());
        settings.port = 8080;
        settings.ip_address = String::new();
        assert!(!settings.is_complete());
    }

    #[test]
    fn test_settings_json_uses_camel_case() {
        let settings = ConnectionSettings {
            ip_address: "127.0.0.1".to_string(),
            port: 3000,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"ipAddress":"127.0.0.1","port":3000}"#);
    }
}
