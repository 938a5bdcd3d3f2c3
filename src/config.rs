//! Configuration loading
//!
//! YAML with a fallback chain: explicit path, then `.docsum.yml` in the
//! working directory, then `~/.config/docsum/docsum.yml`, then built-in
//! defaults. Every field has a default so partial files are fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::ContextConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub llm: LlmConfig,
    pub run: RunConfig,
    pub context: ContextSettings,
    pub checkpoint: CheckpointConfig,
}

/// Completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never appears in config files.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 120_000,
            max_tokens: 8192,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .map_err(|_| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Run loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Iteration cap for one run (checkpointed when exhausted, not an error)
    pub max_iterations: u32,
    /// Lines per suggested reading chunk
    pub chunk_size: u64,
    /// Checkpoint every N iterations
    pub checkpoint_interval: u32,
    /// Consecutive no-progress iterations before a nudge is injected
    pub stall_threshold: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            chunk_size: 300,
            checkpoint_interval: 5,
            stall_threshold: 3,
        }
    }
}

/// Context truncation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContextSettings {
    pub token_budget: usize,
    pub chars_per_token: f64,
    pub min_recent_units: usize,
    pub forced_tail_units: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        let defaults = ContextConfig::default();
        Self {
            token_budget: defaults.token_budget,
            chars_per_token: defaults.chars_per_token,
            min_recent_units: defaults.min_recent_units,
            forced_tail_units: defaults.forced_tail_units,
        }
    }
}

impl ContextSettings {
    pub fn to_context_config(&self) -> ContextConfig {
        ContextConfig {
            token_budget: self.token_budget,
            chars_per_token: self.chars_per_token,
            min_recent_units: self.min_recent_units,
            forced_tail_units: self.forced_tail_units,
        }
    }
}

/// Checkpoint storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckpointConfig {
    /// Checkpoint directory; defaults to the platform data directory
    pub dir: Option<PathBuf>,
}

impl CheckpointConfig {
    /// The directory checkpoints live in
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("docsum")
                .join("checkpoints")
        })
    }
}

impl Config {
    /// Load configuration with the fallback chain
    ///
    /// An explicit path that cannot be read or parsed is an error; the
    /// implicit candidates are skipped silently when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "Config::load: using explicit config file");
            return Self::load_file(path);
        }

        let mut candidates = vec![PathBuf::from(".docsum.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("docsum").join("docsum.yml"));
        }

        for path in candidates {
            if path.exists() {
                info!(path = %path.display(), "Config::load: found config file");
                return Self::load_file(&path);
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.max_iterations == 0 {
            return Err(ConfigError::Invalid("run.max-iterations must be at least 1".to_string()));
        }
        if self.run.chunk_size == 0 {
            return Err(ConfigError::Invalid("run.chunk-size must be at least 1".to_string()));
        }
        if self.context.token_budget == 0 {
            return Err(ConfigError::Invalid("context.token-budget must be positive".to_string()));
        }
        if self.context.chars_per_token <= 0.0 {
            return Err(ConfigError::Invalid("context.chars-per-token must be positive".to_string()));
        }
        Ok(())
    }
}
