//! Application configuration: config file, environment and credentials.

use crate::agents::AgentRole;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Top-level application configuration.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// working setup. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct AppConfig {
    /// HTTP backend bind address.
    api: ApiConfig,
    /// Which models the agents start with.
    models: ModelsConfig,
    /// Timeouts and metric toggles.
    performance: PerformanceConfig,
    /// Terminal dashboard settings.
    dashboard: DashboardConfig,
}

/// HTTP backend bind address.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ApiConfig {
    /// Host to bind to.
    #[setters(into)]
    host: String,
    /// Port to bind to.
    port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Model selection per agent.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ModelsConfig {
    /// Model every agent uses unless overridden.
    #[serde(rename = "default")]
    #[setters(into)]
    default_model: String,
    /// Scout override.
    #[setters(strip_option, into)]
    scout: Option<String>,
    /// Strategist override.
    #[setters(strip_option, into)]
    strategist: Option<String>,
    /// Executor override.
    #[setters(strip_option, into)]
    executor: Option<String>,
    /// Tried in order when an agent's model cannot be built.
    fallback: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            scout: None,
            strategist: None,
            executor: None,
            fallback: vec!["claude-3-5-haiku".to_string(), "llama3.2-1b".to_string()],
        }
    }
}

impl ModelsConfig {
    /// Starting model for `role`.
    pub fn for_role(&self, role: AgentRole) -> &str {
        let over = match role {
            AgentRole::Scout => &self.scout,
            AgentRole::Strategist => &self.strategist,
            AgentRole::Executor => &self.executor,
        };
        over.as_deref().unwrap_or(&self.default_model)
    }
}

/// Timeouts (seconds) and metric toggles.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct PerformanceConfig {
    /// Upper bound on one full Scout/Strategist/Executor decision.
    mcp_coordination_timeout: u64,
    /// Upper bound on a single agent LLM call.
    agent_execution_timeout: u64,
    /// Record per-agent metrics.
    enable_metrics: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            mcp_coordination_timeout: 15,
            agent_execution_timeout: 8,
            enable_metrics: true,
        }
    }
}

/// Terminal dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct DashboardConfig {
    /// Backend the dashboard polls.
    #[setters(into)]
    server_url: String,
    /// Poll interval in milliseconds.
    poll_interval_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 500,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file, or TOML when the extension is `.toml`.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?,
        };

        info!(port = config.api.port, default_model = %config.models.default_model, "Config loaded successfully");
        Ok(config)
    }

    /// Resolves the startup configuration.
    ///
    /// An explicit path must exist. Without one, `config.json` in the working
    /// directory is used when present, defaults otherwise. `HOST` and `PORT`
    /// from the environment override the file.
    #[instrument(skip(path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `HOST`/`PORT` overrides read through `lookup`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            debug!(%host, "HOST override");
            self.api.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.api.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid PORT {:?}: {}", port, e)))?;
            debug!(port = self.api.port, "PORT override");
        }
        Ok(())
    }
}

/// Provider credentials and endpoints, read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, new)]
pub struct Credentials {
    /// `OPENAI_API_KEY`.
    openai_api_key: Option<String>,
    /// `ANTHROPIC_API_KEY`.
    anthropic_api_key: Option<String>,
    /// `OLLAMA_BASE_URL`.
    ollama_base_url: String,
}

impl Credentials {
    /// Reads credentials from the process environment. Empty values count as unset.
    #[instrument]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let creds = Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            ollama_base_url: non_empty("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        };
        if creds.openai_api_key.is_none() && creds.anthropic_api_key.is_none() {
            warn!("No OpenAI or Anthropic API key set; only local models are usable");
        }
        creds
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
