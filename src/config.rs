//! Configuration management for the Pixelworks server

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Upload size limit: 10MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    /// Deployment environment reported by the health endpoint
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted file part, in bytes
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            limits: LimitsConfig {
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            environment: "development".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            limits: LimitsConfig {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.limits.max_upload_bytes)?,
            },
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
        })
    }

    /// Human-readable upload limit, e.g. "10MB"
    pub fn max_upload_label(&self) -> String {
        let bytes = self.limits.max_upload_bytes;
        if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
            format!("{}MB", bytes / (1024 * 1024))
        } else if bytes >= 1024 && bytes % 1024 == 0 {
            format!("{}KB", bytes / 1024)
        } else {
            format!("{} bytes", bytes)
        }
    }
}

/// Read `name` from the environment, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
