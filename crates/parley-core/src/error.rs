use thiserror::Error;

/// Errors surfaced to callers of the library.
///
/// Tool failures never show up here: the registry turns them into text that
/// is fed back to the model. Only configuration and transport problems abort
/// a conversation.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("{0}")]
    Config(String),

    #[error("Model {0} is not supported")]
    UnsupportedModel(String),

    #[error("A tool named '{0}' is already registered")]
    DuplicateTool(String),

    #[error("{provider} API key is not set")]
    MissingCredential { provider: String },

    // --- Backend / transport errors ---
    #[error("{provider} API Error: {message} (status: {status})")]
    Backend {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response format from {provider} API: {detail}")]
    MalformedResponse { provider: String, detail: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // --- Serialization ---
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn missing(parameter: &str) -> Self {
        Self::Config(format!("Required parameter: '{parameter}' is missing."))
    }

    /// True for errors raised before any network activity.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnsupportedModel(_)
                | Self::DuplicateTool(_)
                | Self::MissingCredential { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
