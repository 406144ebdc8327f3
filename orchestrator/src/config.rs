//! Configuration loading
//!
//! Settings live in `.sop.toml`. Missing sections and keys fall back to
//! defaults that match a tool-execution engine and artifact server both
//! running on `localhost:8000`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = ".sop.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid URL for `{field}` ({value}): {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/sop-orchestrator/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("sop-orchestrator").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level configuration (from .sop.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Tool-execution engine section
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_propose_path")]
    pub propose_path: String,
    #[serde(default = "default_execute_path")]
    pub execute_path: String,
}

/// Artifact server section
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Base that annotated image paths are joined to
    #[serde(default = "default_artifact_base_url")]
    pub base_url: String,
}

/// HTTP server section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_engine_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_propose_path() -> String {
    "/process-sopquery".to_string()
}

fn default_execute_path() -> String {
    "/executions/approve".to_string()
}

fn default_artifact_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            timeout_secs: default_timeout_secs(),
            propose_path: default_propose_path(),
            execute_path: default_execute_path(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_url: default_artifact_base_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl OrchestratorConfig {
    /// Load config from .sop.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .sop.toml
    /// 2. Check ~/.config/sop-orchestrator/.sop.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(config_path) = find_config_file(CONFIG_FILE_NAME) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: OrchestratorConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every configured URL is absolute http(s)
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("engine.url", &self.engine.url)?;
        validate_url("artifacts.base_url", &self.artifacts.base_url)?;
        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };

    let url = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme `{}`", other))),
    }
}
