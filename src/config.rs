//! Server configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file named by
//! `VECTRA_CONFIG`, then environment variables (a `.env` file is loaded first
//! when present).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::scoring::ScoringPolicy;
use crate::error::AppError;

const DEFAULT_BIND: &str = "127.0.0.1:8787";
const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    pub bind: String,
    pub data_dir: PathBuf,
    pub log_json: bool,
    pub sentry_dsn: Option<String>,
    pub cors_origins: Vec<String>,
    pub scoring: ScoringPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_json: false,
            sentry_dsn: None,
            cors_origins: Vec::new(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load the full configuration stack for the server binary.
    pub fn load() -> Result<Self, AppError> {
        // Missing .env is the normal case outside local dev.
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("VECTRA_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Apply `VECTRA_*` / `SENTRY_DSN` overrides through a lookup function so
    /// tests don't have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("VECTRA_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = lookup("VECTRA_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("VECTRA_LOG_JSON") {
            self.log_json = parse_bool("VECTRA_LOG_JSON", &flag)?;
        }
        if let Some(origins) = lookup("VECTRA_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(dsn) = lookup("SENTRY_DSN") {
            self.sentry_dsn = if dsn.trim().is_empty() { None } else { Some(dsn) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.bind_addr()?;
        self.scoring.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        self.bind
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address '{}': {}", self.bind, e)))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!("{key} must be a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 8787);
    }

    #[test]
    fn test_toml_overrides_scoring() {
        let config = AppConfig::from_toml_str(
            r#"
            bind = "0.0.0.0:9000"
            [scoring]
            violation_penalty = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.scoring.violation_penalty, 25);
        assert_eq!(config.scoring.truncation_penalty, ScoringPolicy::default().truncation_penalty);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VECTRA_BIND", "127.0.0.1:7000"),
            ("VECTRA_LOG_JSON", "true"),
            ("VECTRA_CORS_ORIGINS", "http://localhost:5173, https://app.vectra.ai"),
            ("SENTRY_DSN", ""),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind, "127.0.0.1:7000");
        assert!(config.log_json);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_bad_bool_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == "VECTRA_LOG_JSON").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_bad_bind_rejected() {
        let config = AppConfig { bind: "not-an-addr".into(), ..AppConfig::default() };
        assert!(config.validate().is_err());
    }
}
