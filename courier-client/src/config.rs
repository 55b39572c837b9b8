//! Configuration loading for the Courier client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub push_endpoint: String,
    pub auth: AuthConfig,
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub jwt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or COURIER_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(Path::new(&path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.push_endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "push_endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.jwt.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "api_key or jwt must be provided".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.initial_ms == 0 || self.reconnect.max_ms < self.reconnect.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnect",
                reason: "initial_ms must be > 0 and max_ms >= initial_ms".to_string(),
            });
        }
        if self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

fn config_path_from_env() -> Option<String> {
    std::env::var("COURIER_CONFIG").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
api_base_url = "https://api.courier.test"
push_endpoint = "wss://push.courier.test/events"
request_timeout_ms = 5000
refresh_interval_ms = 15000

[auth]
api_key = "test-key"

[reconnect]
initial_ms = 500
max_ms = 30000
multiplier = 2.0
jitter_ms = 250
"#;

    fn parse(contents: &str) -> Result<ClientConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        ClientConfig::from_path(file.path())
    }

    #[test]
    fn test_valid_config_parses_and_validates() {
        let config = parse(VALID).unwrap();
        config.validate().unwrap();
        assert_eq!(config.api_base_url, "https://api.courier.test");
        assert_eq!(config.reconnect.jitter_ms, 250);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let contents = format!("{}\nextra_field = 1\n", VALID);
        assert!(matches!(parse(&contents), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_auth_requires_some_credential() {
        let contents = VALID.replace("api_key = \"test-key\"", "");
        let config = parse(&contents).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "auth", .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let contents = VALID.replace("request_timeout_ms = 5000", "request_timeout_ms = 0");
        let config = parse(&contents).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_bounds_rejected() {
        let contents = VALID.replace("max_ms = 30000", "max_ms = 100");
        let config = parse(&contents).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "reconnect",
                ..
            }
        ));
    }
}
