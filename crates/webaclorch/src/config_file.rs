//! Configuration file support for webaclorch
//!
//! Loads and validates webaclorch configuration from TOML files.
//! Default location: /etc/webaclorch/webaclorch.toml

use crate::error::{Result, WebAclError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use waf_orch_common::RetryPolicy;
use waf_types::TokenScope;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/webaclorch/webaclorch.toml";

/// Change-token retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per mutation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry in milliseconds
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    /// Cap on the exponential wait in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Maximum random jitter added to each wait in milliseconds
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Token scope: "global" or "regional:<region>"
    #[serde(default)]
    pub scope: TokenScope,

    /// File holding the local backend's Web ACLs
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// Complete webaclorch configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebAclOrchConfig {
    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
}

// Default functions
fn default_max_attempts() -> u32 {
    10
}

fn default_base_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_jitter() -> u64 {
    100
}

fn default_state_file() -> PathBuf {
    PathBuf::from("/var/lib/webaclorch/state.json")
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            jitter_ms: default_jitter(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            scope: TokenScope::default(),
            state_file: default_state_file(),
        }
    }
}

impl WebAclOrchConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content).map_err(|e| {
                    WebAclError::Config(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "webaclorch: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(WebAclError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WebAclError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Build the change-token retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_backoff: Duration::from_millis(self.retry.base_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            jitter: Duration::from_millis(self.retry.jitter_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(WebAclError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return Err(WebAclError::Config(format!(
                "retry.base_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.base_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        if let TokenScope::Regional(region) = &self.backend.scope {
            if region.is_empty() {
                return Err(WebAclError::Config(
                    "backend.scope region must not be empty".to_string(),
                ));
            }
        }

        if self.backend.state_file.as_os_str().is_empty() {
            return Err(WebAclError::Config(
                "backend.state_file must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
