use super::credentials::Credentials;
use super::models::{CustomModelEntry, ModelFamily};
use crate::error::Result;
use crate::providers::anthropic::ANTHROPIC_BASE_URL;
use crate::providers::deepseek::DEEPSEEK_BASE_URL;
use crate::providers::openai::OPENAI_BASE_URL;
use crate::providers::provider::LlmProvider;
use crate::providers::{AnthropicProvider, DeepSeekProvider, OpenAiProvider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_deepseek_base_url")]
    pub deepseek_base_url: String,
    /// Wall-clock limit for a single backend request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Extra model names and where to route them.
    #[serde(default)]
    pub custom_models: Vec<CustomModelEntry>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

fn default_anthropic_base_url() -> String {
    ANTHROPIC_BASE_URL.to_string()
}

fn default_deepseek_base_url() -> String {
    DEEPSEEK_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_tool_calls() -> usize {
    5
}

fn default_max_history() -> usize {
    100
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            deepseek_base_url: default_deepseek_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_tool_calls: default_max_tool_calls(),
            max_history: default_max_history(),
            custom_models: Vec::new(),
        }
    }
}

/// A provider picked for a model name, plus the identifier to send on the wire.
#[derive(Clone)]
pub struct RoutedModel {
    pub family: ModelFamily,
    pub model: String,
    pub provider: Arc<dyn LlmProvider>,
}

impl ParleyConfig {
    /// `~/.parley/config.json` if present, then `.parley.json` in the working
    /// directory as a shallow override.
    pub fn load() -> Result<Self> {
        let local = std::env::current_dir().ok().map(|d| d.join(".parley.json"));
        Self::load_from(&Self::resolve_path("config.json"), local.as_deref())
    }

    pub fn load_from(config_path: &Path, local_path: Option<&Path>) -> Result<Self> {
        let mut config = if config_path.exists() {
            let data = std::fs::read_to_string(config_path)?;
            serde_json::from_str::<ParleyConfig>(&data)?
        } else {
            ParleyConfig::default()
        };

        if let Some(local) = local_path.filter(|p| p.exists()) {
            debug!("applying local config override {}", local.display());
            let data = std::fs::read_to_string(local)?;
            let override_val: serde_json::Value = serde_json::from_str(&data)?;
            let mut base = serde_json::to_value(&config)?;
            if let (Some(base_obj), Some(over_obj)) =
                (base.as_object_mut(), override_val.as_object())
            {
                for (k, v) in over_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            config = serde_json::from_value(base)?;
        }

        Ok(config)
    }

    pub fn resolve_path(relative: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parley")
            .join(relative)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Route a model name to its backend. Nothing touches the network here.
    pub fn route(&self, model: &str, credentials: &Credentials) -> Result<RoutedModel> {
        let family = ModelFamily::resolve(model, &self.custom_models)?;
        let entry = self.custom_models.iter().find(|e| e.name == model);
        let base_url = entry
            .and_then(|e| e.base_url.clone())
            .unwrap_or_else(|| self.base_url_for(family).to_string());
        let api_key = entry
            .and_then(|e| e.api_key.clone())
            .or_else(|| credentials.key_for(family).map(str::to_string));
        let wire_model = entry.map_or(model, CustomModelEntry::wire_model).to_string();
        let keyless = entry.is_some_and(CustomModelEntry::is_keyless);

        debug!("routing model {} to {} at {}", model, family.label(), base_url);
        let timeout = self.request_timeout();
        let provider: Arc<dyn LlmProvider> = match family {
            ModelFamily::OpenAi => {
                let p = OpenAiProvider::new(base_url, api_key).with_timeout(timeout)?;
                Arc::new(if keyless { p.keyless() } else { p })
            }
            ModelFamily::Anthropic => {
                let p = AnthropicProvider::new(base_url, api_key).with_timeout(timeout)?;
                Arc::new(if keyless { p.keyless() } else { p })
            }
            ModelFamily::DeepSeek => {
                let p = DeepSeekProvider::new(base_url, api_key).with_timeout(timeout)?;
                Arc::new(if keyless { p.keyless() } else { p })
            }
        };
        Ok(RoutedModel {
            family,
            model: wire_model,
            provider,
        })
    }

    fn base_url_for(&self, family: ModelFamily) -> &str {
        match family {
            ModelFamily::OpenAi => &self.openai_base_url,
            ModelFamily::Anthropic => &self.anthropic_base_url,
            ModelFamily::DeepSeek => &self.deepseek_base_url,
        }
    }
}
