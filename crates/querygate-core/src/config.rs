//! Configuration schema (querygate.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SQL dialect of the target engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// SQL Server / Azure SQL (`TOP (n)`, `[ident]`, `@pN`)
    MsSql,

    /// PostgreSQL (`LIMIT n`, `"ident"`, `$N`)
    Postgres,

    /// BigQuery (`LIMIT n`, `` `ident` ``, `@pN`)
    BigQuery,

    /// Generic ANSI SQL (`FETCH FIRST n ROWS ONLY`, `"ident"`, `?`)
    Ansi,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::MsSql
    }
}

/// Row limit policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Hard ceiling on rows any statement may return
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,

    /// Limit applied when the intent requests none
    #[serde(default = "default_rows")]
    pub default_rows: u32,

    /// Fail instead of clamping when an intent asks for more than `max_rows`
    #[serde(default)]
    pub reject_excess_limit: bool,
}

fn default_max_rows() -> u32 {
    1000
}

fn default_rows() -> u32 {
    100
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            default_rows: default_rows(),
            reject_excess_limit: false,
        }
    }
}

impl LimitConfig {
    /// Limit used when none is requested, never above the ceiling
    pub fn effective_default(&self) -> u32 {
        self.default_rows.min(self.max_rows)
    }
}

/// Which kind of model endpoint a backend talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Locally hosted model (Ollama-style generate API)
    Local,

    /// Hosted model behind an OpenAI-compatible chat API
    Remote,
}

/// One model-backed translation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name used in logs and failure reports
    pub name: String,

    pub kind: BackendKind,

    /// Base URL of the model endpoint
    pub endpoint: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Environment variable holding the credential, if the endpoint needs one
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Replies reporting a lower confidence are treated as failures
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_min_confidence() -> f64 {
    0.7
}

fn default_enabled() -> bool {
    true
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect of emitted statements
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Schema/alias source document (relative to the config file)
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    #[serde(default)]
    pub limits: LimitConfig,

    /// Model backends, tried in order before the rule-based extractor
    #[serde(default)]
    pub backends: Vec<BackendConfig>,

    /// Keep request text out of logs (only its length is logged)
    #[serde(default)]
    pub redact_sensitive_data: bool,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            schema_path: None,
            limits: LimitConfig::default(),
            backends: Vec::new(),
            redact_sensitive_data: false,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_rows == 0 {
            return Err(ConfigError::Invalid("limits.max_rows must be at least 1".to_string()));
        }
        if self.limits.default_rows == 0 {
            return Err(ConfigError::Invalid(
                "limits.default_rows must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name '{}'",
                    backend.name
                )));
            }
            if backend.timeout_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' needs a non-zero timeout_ms",
                    backend.name
                )));
            }
        }

        Ok(())
    }

    /// Schema source path resolved against the project root
    pub fn resolved_schema_path(&self) -> Option<PathBuf> {
        self.schema_path.as_ref().map(|p| {
            if p.is_relative() {
                self.project_root.join(p)
            } else {
                p.clone()
            }
        })
    }

    /// Enabled backends in chain order
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|b| b.enabled)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
