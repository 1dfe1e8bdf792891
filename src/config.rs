//! Configuration types for the search service.
//!
//! Loaded from `config.toml`; every section and field falls back to its
//! default when missing.

use clipseek_fusion::FusionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, ServiceError};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CLIPSEEK_CONFIG_DIR";

/// Top-level configuration for the search service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP façade settings.
    pub server: ServerConfig,
    /// Remote text encoder settings.
    pub encoder: EncoderConfig,
    /// Fusion engine tuning.
    pub fusion: FusionConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// HTTP façade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// URL prefix under which image files are served to clients.
    pub images_route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            images_route: "/images".to_owned(),
        }
    }
}

/// Remote text encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Embedding endpoint accepting `{"text": ...}`.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Embedding length the endpoint returns.
    pub dimension: usize,
    /// Model name reported by `/health`.
    pub model: String,
    /// Device label reported by `/health`.
    pub device: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8001/embed".to_owned(),
            timeout_seconds: 30,
            dimension: 512,
            model: "ViT-B/32".to_owned(),
            device: "cpu".to_owned(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.fusion
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        if self.encoder.timeout_seconds == 0 {
            return Err(ServiceError::Config(
                "encoder.timeout_seconds must be positive".into(),
            ));
        }
        if self.encoder.dimension == 0 {
            return Err(ServiceError::Config(
                "encoder.dimension must be positive".into(),
            ));
        }
        if !self.server.images_route.starts_with('/') {
            return Err(ServiceError::Config(format!(
                "server.images_route must start with '/', got {:?}",
                self.server.images_route
            )));
        }
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        config_dir().join("config.toml")
    }
}

/// Service config directory.
///
/// Resolves to `dirs::config_dir()/clipseek/` by default. Override with
/// the `CLIPSEEK_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("clipseek"))
        .unwrap_or_else(|| PathBuf::from("/tmp/clipseek-config"))
}
