//! Catalogue of models an agent can be switched to.

use crate::config::Credentials;
use crate::llm_client::{LlmClient, LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How long an Ollama inventory request may take.
pub const OLLAMA_INVENTORY_TIMEOUT: Duration = Duration::from_secs(2);

/// One registry entry: everything needed to build a client for a model.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize, new)]
pub struct ModelEntry {
    /// Registry key, e.g. `gpt-4o-mini`.
    #[new(into)]
    name: String,
    /// Provider serving the model.
    provider: LlmProvider,
    /// Provider-side model id.
    #[new(into)]
    model_id: String,
    /// Human-readable name.
    #[new(into)]
    display_name: String,
    /// Short description.
    #[new(into)]
    description: String,
    /// Estimated USD per 1k tokens.
    estimated_cost_per_1k_tokens: f64,
    /// Completion token limit.
    max_tokens: u32,
    /// Sampling temperature.
    temperature: f32,
}

impl ModelEntry {
    /// Whether the provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self.provider, LlmProvider::Ollama)
    }
}

/// Where a model stands before it can serve requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Ready to answer.
    #[display("available")]
    Available,
    /// Pulled into Ollama but not loaded.
    #[display("downloaded")]
    Downloaded,
    /// Not pulled into Ollama yet.
    #[display("need_download")]
    NeedDownload,
    /// Missing credentials, or the Ollama server did not answer.
    #[display("unavailable")]
    Unavailable,
}

/// Whether a model can be used right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAvailability {
    /// The entry.
    #[serde(flatten)]
    pub entry: ModelEntry,
    /// `lifecycle_status` is `available`.
    pub available: bool,
    /// The provider needs an API key.
    pub requires_api_key: bool,
    /// Lifecycle stage.
    pub lifecycle_status: LifecycleStatus,
    /// What to do about it, when unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaModelList {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

/// Models an Ollama server has pulled and loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OllamaInventory {
    base_url: String,
    reachable: bool,
    installed: BTreeSet<String>,
    running: BTreeSet<String>,
}

impl OllamaInventory {
    /// Inventory of a server that did not answer.
    pub fn unreachable(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Inventory with the given installed and running model ids.
    pub fn reachable<'a>(
        base_url: impl Into<String>,
        installed: impl IntoIterator<Item = &'a str>,
        running: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            reachable: true,
            installed: installed.into_iter().map(normalize_tag).collect(),
            running: running.into_iter().map(normalize_tag).collect(),
        }
    }

    /// Queries `{base_url}/api/tags` and `{base_url}/api/ps`.
    ///
    /// Any failure of the tags request counts as unreachable; a failed `ps`
    /// request means nothing is loaded.
    #[instrument(skip(client))]
    pub async fn fetch(client: &reqwest::Client, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let installed = match list_models(client, &format!("{base_url}/api/tags")).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Ollama is not reachable");
                return Self::unreachable(base_url);
            }
        };
        let running = list_models(client, &format!("{base_url}/api/ps"))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Ollama /api/ps failed");
                OllamaModelList::default()
            });
        debug!(installed = installed.models.len(), running = running.models.len(), "Ollama inventory");
        Self::reachable(
            base_url,
            installed.models.iter().map(|m| m.name.as_str()),
            running.models.iter().map(|m| m.name.as_str()),
        )
    }

    /// Whether the server answered.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Lifecycle stage of `model_id` on this server.
    pub fn status(&self, model_id: &str) -> LifecycleStatus {
        let model_id = normalize_tag(model_id);
        if !self.reachable {
            LifecycleStatus::Unavailable
        } else if self.running.contains(&model_id) {
            LifecycleStatus::Available
        } else if self.installed.contains(&model_id) {
            LifecycleStatus::Downloaded
        } else {
            LifecycleStatus::NeedDownload
        }
    }

    fn hint(&self, model_id: &str) -> Option<String> {
        match self.status(model_id) {
            LifecycleStatus::Available => None,
            LifecycleStatus::Downloaded => Some(format!("Start with: ollama run {model_id}")),
            LifecycleStatus::NeedDownload => Some(format!("Download with: ollama pull {model_id}")),
            LifecycleStatus::Unavailable => Some(format!("Ollama is not accessible at {}", self.base_url)),
        }
    }
}

/// Ollama reports untagged models as `name:latest`.
fn normalize_tag(model_id: &str) -> String {
    if model_id.contains(':') {
        model_id.to_string()
    } else {
        format!("{model_id}:latest")
    }
}

async fn list_models(client: &reqwest::Client, url: &str) -> Result<OllamaModelList, reqwest::Error> {
    client
        .get(url)
        .timeout(OLLAMA_INVENTORY_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Registry lookup or client construction failure.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry under that name.
    #[display("Unknown model: {name}")]
    UnknownModel {
        /// Requested name.
        name: String,
    },
    /// The provider's API key is not configured.
    #[display("Model {model} requires {variable} to be set")]
    MissingCredential {
        /// Requested model.
        model: String,
        /// Environment variable that must be set.
        variable: &'static str,
    },
}

/// Name → model lookup used for hot-swapping agent models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: BTreeMap<String, ModelEntry>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModelRegistry {
    /// Registry pre-filled with the stock OpenAI, Anthropic and Ollama models.
    #[instrument]
    pub fn with_defaults() -> Self {
        use LlmProvider::{Anthropic, Ollama, OpenAI};
        let mut registry = Self {
            entries: BTreeMap::new(),
        };
        for entry in [
            ModelEntry::new("gpt-4", OpenAI, "gpt-4", "GPT-4", "Most capable OpenAI model, highest cost", 0.03, 1024, 0.1),
            ModelEntry::new("gpt-4o-mini", OpenAI, "gpt-4o-mini", "GPT-4o mini", "Fast, inexpensive OpenAI model", 0.00015, 1024, 0.1),
            ModelEntry::new("gpt-3.5-turbo", OpenAI, "gpt-3.5-turbo", "GPT-3.5 Turbo", "Fast and cost-effective", 0.0015, 1024, 0.1),
            ModelEntry::new("claude-3-5-haiku", Anthropic, "claude-3-5-haiku-20241022", "Claude 3.5 Haiku", "Fast Anthropic model", 0.0008, 1024, 0.1),
            ModelEntry::new("claude-3-sonnet", Anthropic, "claude-3-sonnet-20240229", "Claude 3 Sonnet", "Balanced Anthropic model", 0.003, 1024, 0.1),
            ModelEntry::new("llama3.2-1b", Ollama, "llama3.2:1b", "Llama 3.2 1B (local)", "Small local model via Ollama", 0.0, 512, 0.1),
            ModelEntry::new("llama3-latest", Ollama, "llama3:latest", "Llama 3 (local)", "Local Llama 3 via Ollama", 0.0, 512, 0.1),
            ModelEntry::new("mistral-7b", Ollama, "mistral:7b", "Mistral 7B (local)", "Local Mistral via Ollama", 0.0, 512, 0.1),
        ] {
            registry.register(entry);
        }
        debug!(count = registry.entries.len(), "Default models registered");
        registry
    }

    /// Adds or replaces an entry, returning the replaced one.
    #[instrument(skip(self, entry), fields(name = %entry.name))]
    pub fn register(&mut self, entry: ModelEntry) -> Option<ModelEntry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.get(name)
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }

    /// The API key `entry` needs from `credentials`, or the variable that is missing.
    fn api_key(entry: &ModelEntry, credentials: &Credentials) -> Result<String, RegistryError> {
        let (key, variable) = match entry.provider {
            LlmProvider::OpenAI => (credentials.openai_api_key(), "OPENAI_API_KEY"),
            LlmProvider::Anthropic => (credentials.anthropic_api_key(), "ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => return Ok(String::new()),
        };
        key.clone().ok_or_else(|| RegistryError::MissingCredential {
            model: entry.name.clone(),
            variable,
        })
    }

    /// Availability of every entry under `credentials`, with Ollama models
    /// judged against `ollama`.
    pub fn availability(
        &self,
        credentials: &Credentials,
        ollama: &OllamaInventory,
    ) -> Vec<ModelAvailability> {
        self.entries()
            .map(|entry| {
                let (lifecycle_status, unavailable_reason) = match entry.provider {
                    LlmProvider::Ollama => (ollama.status(&entry.model_id), ollama.hint(&entry.model_id)),
                    _ => match Self::api_key(entry, credentials) {
                        Ok(_) => (LifecycleStatus::Available, None),
                        Err(e) => (LifecycleStatus::Unavailable, Some(e.to_string())),
                    },
                };
                ModelAvailability {
                    entry: entry.clone(),
                    available: lifecycle_status == LifecycleStatus::Available,
                    requires_api_key: entry.requires_api_key(),
                    lifecycle_status,
                    unavailable_reason,
                }
            })
            .collect()
    }

    /// Like [`availability`](Self::availability), asking the Ollama server at
    /// `credentials.ollama_base_url()` for its inventory first.
    #[instrument(skip(self, client, credentials))]
    pub async fn check_availability(
        &self,
        client: &reqwest::Client,
        credentials: &Credentials,
    ) -> Vec<ModelAvailability> {
        let ollama = OllamaInventory::fetch(client, credentials.ollama_base_url()).await;
        self.availability(credentials, &ollama)
    }

    /// Builds a client for `name`.
    ///
    /// Ollama models always build; whether the local server answers is only
    /// known at call time.
    #[instrument(skip(self, credentials))]
    pub fn build_client(&self, name: &str, credentials: &Credentials) -> Result<LlmClient, RegistryError> {
        let entry = self.get(name).ok_or_else(|| {
            warn!("Unknown model requested");
            RegistryError::UnknownModel {
                name: name.to_string(),
            }
        })?;
        let api_key = Self::api_key(entry, credentials)?;

        let mut config = LlmConfig::new(entry.provider, api_key, entry.model_id.clone(), entry.max_tokens)
            .with_temperature(entry.temperature);
        if entry.provider == LlmProvider::Ollama {
            config = config.with_base_url(credentials.ollama_base_url().clone());
        }
        info!(provider = %entry.provider, model_id = %entry.model_id, "Built LLM client from registry");
        Ok(LlmClient::new(config))
    }
}
