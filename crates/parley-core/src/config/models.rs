use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const OPENAI_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o"];

pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-haiku-latest",
    "claude-3-7-sonnet-latest",
    "claude-3-haiku-20240307",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-7-sonnet-20250219",
];

pub const DEEPSEEK_MODELS: &[&str] = &["deepseek-chat", "deepseek-r1"];

/// Which backend adapter serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    OpenAi,
    Anthropic,
    DeepSeek,
}

/// A named model entry routed to one of the supported backends.
///
/// Example in `~/.parley/config.json` or `.parley.json`:
/// ```json
/// {
///   "custom_models": [
///     {
///       "name": "llama3.2-local",
///       "provider": "openai",
///       "base_url": "http://localhost:8080/v1",
///       "model": "llama3.2"
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomModelEntry {
    /// Name callers pass as `model`.
    pub name: String,
    #[serde(default = "default_entry_provider")]
    pub provider: ModelFamily,
    /// Overrides the provider's configured base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Overrides the provider's default key. An empty key means requests go
    /// out without credentials, for local servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Identifier sent on the wire; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_entry_provider() -> ModelFamily {
    ModelFamily::OpenAi
}

impl CustomModelEntry {
    pub fn wire_model(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.name)
    }

    pub fn is_keyless(&self) -> bool {
        self.api_key.as_deref() == Some("")
    }
}

impl ModelFamily {
    pub fn of_builtin(model: &str) -> Option<Self> {
        if OPENAI_MODELS.contains(&model) {
            Some(Self::OpenAi)
        } else if ANTHROPIC_MODELS.contains(&model) {
            Some(Self::Anthropic)
        } else if DEEPSEEK_MODELS.contains(&model) {
            Some(Self::DeepSeek)
        } else {
            None
        }
    }

    /// Custom entries shadow the built-in tables.
    pub fn resolve(model: &str, custom: &[CustomModelEntry]) -> Result<Self> {
        custom
            .iter()
            .find(|e| e.name == model)
            .map(|e| e.provider)
            .or_else(|| Self::of_builtin(model))
            .ok_or_else(|| Error::UnsupportedModel(model.to_string()))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::DeepSeek => "DeepSeek",
        }
    }
}
