//! Daemon configuration file.
//!
//! YAML by default; a path ending in `.toml` is parsed as TOML.
//!
//! ```yaml
//! grpcPort: 50051
//! httpPort: 8080
//! default:
//!   metricName: queue_depth
//!   targetSize: 1
//!   active: false
//!   metricValue: 0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scalebridge_registry::DefaultStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config: unmarshal yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config: unmarshal toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config: invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Port of the external-scaler gRPC server.
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    /// Port of the HTTP event API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Global default state and the reported metric.
    #[serde(alias = "defaultConfig")]
    pub default: DefaultStatus,
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_http_port() -> u16 {
    8080
}

impl BridgeConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default.metric_name.trim().is_empty() {
            return Err(ConfigError::Invalid("default.metricName must not be empty".into()));
        }
        if self.default.target_size < 1 {
            return Err(ConfigError::Invalid(format!(
                "default.targetSize must be at least 1, got {}",
                self.default.target_size
            )));
        }
        // Port 0 asks the OS for an ephemeral port, so two zeros do not clash.
        if self.grpc_port != 0 && self.grpc_port == self.http_port {
            return Err(ConfigError::Invalid(format!(
                "grpcPort and httpPort must differ, both are {}",
                self.grpc_port
            )));
        }
        Ok(())
    }
}
