use super::models::ModelFamily;
use serde::{Deserialize, Serialize};

/// Default API keys, one per backend. A key passed with an individual call
/// always wins over these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
    #[serde(default)]
    pub deepseek: Option<String>,
}

impl Credentials {
    /// `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and `DEEPSEEK_API_KEY`; unset or
    /// empty variables leave the slot empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            openai: read("OPENAI_API_KEY"),
            anthropic: read("ANTHROPIC_API_KEY"),
            deepseek: read("DEEPSEEK_API_KEY"),
        }
    }

    pub fn key_for(&self, family: ModelFamily) -> Option<&str> {
        match family {
            ModelFamily::OpenAi => self.openai.as_deref(),
            ModelFamily::Anthropic => self.anthropic.as_deref(),
            ModelFamily::DeepSeek => self.deepseek.as_deref(),
        }
    }
}
