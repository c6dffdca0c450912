//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::pipeline::activity::DEFAULT_ACTIVITY_CAPACITY;
use crate::pipeline::ChainMode;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub chain_mode: ChainMode,
    pub activity_capacity: usize,
    /// Pipeline file loaded at start and written on shutdown
    pub data_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chain_mode: ChainMode::Permissive,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            data_file: None,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub pipeline: PipelineConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        check_dotenv(dotenvy::dotenv().map(|_| ()))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: lookup("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let chain_mode = match lookup("PIPELINE_CHAIN_MODE") {
            Some(raw) => raw.parse::<ChainMode>().map_err(ConfigError::InvalidValue)?,
            None => ChainMode::default(),
        };

        let activity_capacity = match lookup("PIPELINE_ACTIVITY_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(format!(
                        "PIPELINE_ACTIVITY_CAPACITY must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_ACTIVITY_CAPACITY,
        };

        let data_file = lookup("PIPELINE_DATA_FILE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            server,
            cors,
            pipeline: PipelineConfig {
                chain_mode,
                activity_capacity,
                data_file,
            },
        })
    }
}

/// A missing .env file is fine; a malformed one is not
fn check_dotenv(result: Result<(), dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Err(e) if !e.not_found() => Err(ConfigError::EnvLoad(e)),
        _ => Ok(()),
    }
}
