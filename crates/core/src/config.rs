//! Configuration management for the carver CLI.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.carver/config.yaml)
//!
//! Precedence is CLI flags > environment variables > config file > defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CarverError, CarverResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// CLI behavior across commands, including the chunking knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .carver/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider (e.g., "ollama", "openai", "claude")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Chunking engine knobs
    pub chunking: ChunkingConfig,

    /// LLM provider configurations
    pub llm: Option<LlmSettings>,
}

/// Numeric knobs for the recursive chunking engine.
///
/// Poorly tuned thresholds produce 2-4 character trailing fragments, so
/// every threshold is configurable rather than hard-coded.
///
/// All sizes are byte lengths of the normalized UTF-8 text; cuts always
/// land on line boundaries, so they never split a character. Chunk records
/// carry a separate `char_count` for consumers that need character units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingConfig {
    /// Target chunk size in bytes
    pub target_chunk_size: usize,

    /// Resplit window size as a multiple of the target chunk size
    pub window_multiplier: f32,

    /// Remainders below `small_enough_multiplier * target_chunk_size`
    /// go straight to the finalize phase
    pub small_enough_multiplier: f32,

    /// Minimum viable chunk length in bytes; shorter cuts are never
    /// committed as standalone chunks
    pub min_chunk_len: usize,

    /// Maximum attempts per oracle call (transient failures)
    pub max_oracle_attempts: u32,

    /// Timeout for a single oracle call, in seconds
    pub oracle_timeout_secs: u64,

    /// Maximum number of documents chunked concurrently
    pub max_parallel_documents: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: 500,
            window_multiplier: 2.0,
            small_enough_multiplier: 1.5,
            min_chunk_len: 64,
            max_oracle_attempts: 3,
            oracle_timeout_secs: 120,
            max_parallel_documents: 2,
        }
    }
}

impl ChunkingConfig {
    /// Remainders at or below this length are finalized without another
    /// resplit round.
    pub fn small_enough_threshold(&self) -> usize {
        (self.target_chunk_size as f32 * self.small_enough_multiplier) as usize
    }

    /// Upper bound on the resplit window shown to the oracle.
    pub fn window_budget(&self) -> usize {
        (self.target_chunk_size as f32 * self.window_multiplier) as usize
    }

    /// Validate that the knobs are internally consistent.
    pub fn validate(&self) -> CarverResult<()> {
        if self.target_chunk_size == 0 {
            return Err(CarverError::Config(
                "targetChunkSize must be positive".to_string(),
            ));
        }
        if self.min_chunk_len == 0 || self.min_chunk_len >= self.target_chunk_size {
            return Err(CarverError::Config(format!(
                "minChunkLen must be in 1..targetChunkSize, got {}",
                self.min_chunk_len
            )));
        }
        if self.window_multiplier < 1.0 {
            return Err(CarverError::Config(
                "windowMultiplier must be at least 1.0".to_string(),
            ));
        }
        if self.small_enough_multiplier < 1.0 {
            return Err(CarverError::Config(
                "smallEnoughMultiplier must be at least 1.0".to_string(),
            ));
        }
        if self.max_oracle_attempts == 0 {
            return Err(CarverError::Config(
                "maxOracleAttempts must be at least 1".to_string(),
            ));
        }
        if self.max_parallel_documents == 0 {
            return Err(CarverError::Config(
                "maxParallelDocuments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderSettings>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderSettings {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        /// Model residency: "resident" keeps the model loaded between
        /// calls, "load-per-call" releases it after each request
        residency: Option<String>,
        timeout: Option<u64>,
    },
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    chunking: Option<ChunkingConfig>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            chunking: ChunkingConfig::default(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `CARVER_WORKSPACE`: Override workspace path
    /// - `CARVER_CONFIG`: Path to config file
    /// - `CARVER_PROVIDER`: LLM provider
    /// - `CARVER_MODEL`: Model identifier
    /// - `CARVER_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> CarverResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CARVER_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CARVER_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(CarverError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".carver/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CARVER_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CARVER_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("CARVER_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> CarverResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CarverError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            CarverError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_settings) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_settings {
                    ProviderSettings::OpenAI { model, .. } => model.clone(),
                    ProviderSettings::Claude { model, .. } => model.clone(),
                    ProviderSettings::Ollama { model, .. } => model.clone(),
                };
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .carver directory.
    pub fn carver_dir(&self) -> PathBuf {
        self.workspace.join(".carver")
    }

    /// Ensure the .carver directory exists.
    pub fn ensure_carver_dir(&self) -> CarverResult<()> {
        let carver_dir = self.carver_dir();
        if !carver_dir.exists() {
            std::fs::create_dir_all(&carver_dir).map_err(|e| {
                CarverError::Config(format!("Failed to create .carver directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the active provider configuration.
    pub fn get_provider_settings(&self, provider: &str) -> Option<ProviderSettings> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Check explicit CARVER_API_KEY first
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        // Try provider-specific config
        if let Some(provider_settings) = self.get_provider_settings(provider) {
            let env_var = match provider_settings {
                ProviderSettings::OpenAI { api_key_env, .. } => Some(api_key_env),
                ProviderSettings::Claude { api_key_env, .. } => Some(api_key_env),
                ProviderSettings::Ollama { .. } => None,
            };

            if let Some(env_var) = env_var {
                if let Ok(key) = std::env::var(&env_var) {
                    return Some(key);
                }
            }
        }

        None
    }

    /// Validate configuration for the active provider and the chunking knobs.
    pub fn validate(&self) -> CarverResult<()> {
        let provider = &self.provider;
        let known_providers = ["ollama", "openai", "claude"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(CarverError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if let Some(provider_settings) = self.get_provider_settings(provider) {
            match provider_settings {
                ProviderSettings::OpenAI { api_key_env, .. }
                | ProviderSettings::Claude { api_key_env, .. } => {
                    if std::env::var(&api_key_env).is_err() {
                        return Err(CarverError::Config(format!(
                            "API key not found in environment variable: {}",
                            api_key_env
                        )));
                    }
                }
                ProviderSettings::Ollama { .. } => {
                    // Ollama doesn't require API keys
                }
            }
        }

        self.chunking.validate()
    }
}
