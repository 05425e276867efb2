//! Application Configuration
//!
//! Where the data lives (hosted service or local database file), the trial
//! length and the log directory. Loaded from a JSON file, from the
//! environment, or both (environment wins field by field).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entitlement::{TrialPolicy, DEFAULT_TRIAL_DAYS};

pub const ENV_URL: &str = "TASKDECK_URL";
pub const ENV_ANON_KEY: &str = "TASKDECK_ANON_KEY";
pub const ENV_DB_PATH: &str = "TASKDECK_DB_PATH";
pub const ENV_TRIAL_DAYS: &str = "TASKDECK_TRIAL_DAYS";
pub const ENV_LOG_DIR: &str = "TASKDECK_LOG_DIR";

/// Longest accepted trial, in days
pub const MAX_TRIAL_DAYS: u32 = 36_500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("No data source configured (set TASKDECK_URL and TASKDECK_ANON_KEY, or TASKDECK_DB_PATH)")]
    MissingGateway,
}

/// Which gateway backs the stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayConfig {
    Hosted { url: String, anon_key: String },
    Local { db_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_trial_days() -> u32 {
    DEFAULT_TRIAL_DAYS
}

/// Partially specified config, as read from a file before env overrides
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    gateway: Option<GatewayConfig>,
    #[serde(default)]
    trial_days: Option<u32>,
    #[serde(default)]
    log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn local(db_path: impl Into<PathBuf>) -> Self {
        Self {
            gateway: GatewayConfig::Local {
                db_path: db_path.into(),
            },
            trial_days: DEFAULT_TRIAL_DAYS,
            log_dir: None,
        }
    }

    pub fn hosted(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            gateway: GatewayConfig::Hosted {
                url: url.into(),
                anon_key: anon_key.into(),
            },
            trial_days: DEFAULT_TRIAL_DAYS,
            log_dir: None,
        }
    }

    pub fn trial_policy(&self) -> TrialPolicy {
        TrialPolicy::new(self.trial_days)
    }

    /// Read a JSON config file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&text)?;
        log::debug!("[config] loaded {}", path.display());
        Self::resolve(raw, |key| std::env::var(key).ok())
    }

    /// Build entirely from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(RawConfig::default(), |key| std::env::var(key).ok())
    }

    fn resolve(raw: RawConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gateway = match (env(ENV_URL), env(ENV_ANON_KEY), env(ENV_DB_PATH)) {
            (Some(url), Some(anon_key), _) => GatewayConfig::Hosted { url, anon_key },
            (_, _, Some(db_path)) => GatewayConfig::Local {
                db_path: PathBuf::from(db_path),
            },
            _ => raw.gateway.ok_or(ConfigError::MissingGateway)?,
        };

        let trial_days = match env(ENV_TRIAL_DAYS) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TRIAL_DAYS,
                value,
            })?,
            None => raw.trial_days.unwrap_or(DEFAULT_TRIAL_DAYS),
        };

        let config = Self {
            gateway,
            trial_days,
            log_dir: env(ENV_LOG_DIR).map(PathBuf::from).or(raw.log_dir),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trial_days == 0 || self.trial_days > MAX_TRIAL_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "trial_days",
                value: self.trial_days.to_string(),
            });
        }
        match &self.gateway {
            GatewayConfig::Hosted { url, .. } if !(url.starts_with("http://") || url.starts_with("https://")) => {
                Err(ConfigError::InvalidValue {
                    key: "url",
                    value: url.clone(),
                })
            }
            GatewayConfig::Hosted { anon_key, .. } if anon_key.trim().is_empty() => Err(ConfigError::InvalidValue {
                key: "anon_key",
                value: String::new(),
            }),
            GatewayConfig::Local { db_path } if db_path.as_os_str().is_empty() => Err(ConfigError::InvalidValue {
                key: "db_path",
                value: String::new(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_load_hosted_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"gateway": {{"kind": "hosted", "url": "https://demo.example", "anon_key": "k"}}, "trial_days": 14}}"#
        )
        .unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let raw: RawConfig = serde_json::from_str(&text).unwrap();
        let config = AppConfig::resolve(raw, env_of(&[])).unwrap();

        assert_eq!(config, AppConfig {
            trial_days: 14,
            ..AppConfig::hosted("https://demo.example", "k")
        });
        assert_eq!(config.trial_policy().trial_days, 14);
    }

    #[test]
    fn test_trial_days_default() {
        let raw: RawConfig = serde_json::from_str(r#"{"gateway": {"kind": "local", "db_path": "/tmp/x.db"}}"#).unwrap();
        let config = AppConfig::resolve(raw, env_of(&[])).unwrap();
        assert_eq!(config.trial_days, 7);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let raw: RawConfig = serde_json::from_str(r#"{"gateway": {"kind": "local", "db_path": "/tmp/x.db"}, "trial_days": 3}"#).unwrap();
        let env = env_of(&[
            (ENV_URL, "https://env.example"),
            (ENV_ANON_KEY, "env-key"),
            (ENV_TRIAL_DAYS, "10"),
            (ENV_LOG_DIR, "/var/log/taskdeck"),
        ]);
        let config = AppConfig::resolve(raw, env).unwrap();

        assert_eq!(config.gateway, GatewayConfig::Hosted {
            url: "https://env.example".into(),
            anon_key: "env-key".into(),
        });
        assert_eq!(config.trial_days, 10);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/taskdeck")));
    }

    #[test]
    fn test_hosted_wins_over_local_env() {
        let env = env_of(&[(ENV_URL, "https://h.example"), (ENV_ANON_KEY, "k"), (ENV_DB_PATH, "/tmp/db")]);
        let config = AppConfig::resolve(RawConfig::default(), env).unwrap();
        assert!(matches!(config.gateway, GatewayConfig::Hosted { .. }));
    }

    #[test]
    fn test_url_without_key_falls_back_to_local() {
        let env = env_of(&[(ENV_URL, "https://h.example"), (ENV_DB_PATH, "/tmp/db")]);
        let config = AppConfig::resolve(RawConfig::default(), env).unwrap();
        assert_eq!(config.gateway, GatewayConfig::Local { db_path: "/tmp/db".into() });
    }

    #[test]
    fn test_missing_gateway() {
        let result = AppConfig::resolve(RawConfig::default(), env_of(&[]));
        assert!(matches!(result, Err(ConfigError::MissingGateway)));
    }

    #[test]
    fn test_invalid_values() {
        let env = env_of(&[(ENV_DB_PATH, "/tmp/db"), (ENV_TRIAL_DAYS, "soon")]);
        assert!(matches!(
            AppConfig::resolve(RawConfig::default(), env),
            Err(ConfigError::InvalidValue { key: ENV_TRIAL_DAYS, .. })
        ));

        let env = env_of(&[(ENV_DB_PATH, "/tmp/db"), (ENV_TRIAL_DAYS, "0")]);
        assert!(AppConfig::resolve(RawConfig::default(), env).is_err());

        assert!(AppConfig::hosted("ftp://nope", "k").validate().is_err());
        assert!(AppConfig::hosted("https://ok.example", " ").validate().is_err());
    }

    #[test]
    fn test_trial_days_upper_bound() {
        let mut config = AppConfig::local("/tmp/db");
        config.trial_days = MAX_TRIAL_DAYS;
        assert!(config.validate().is_ok());

        config.trial_days = 100_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: "trial_days", .. })
        ));

        let env = env_of(&[(ENV_DB_PATH, "/tmp/db"), (ENV_TRIAL_DAYS, "100000000")]);
        assert!(AppConfig::resolve(RawConfig::default(), env).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(ConfigError::Parse(_))));
    }
}
