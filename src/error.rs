//! Error types for the proxy.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Upstream unreachable: {message}")]
    Transport { message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Network-level failure talking to the upstream. The reqwest error is
    /// stripped of its URL first, since the Gemini URL carries the key.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.without_url().to_string(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    /// The message without the variant prefix, fit to send back to a client.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Config { message }
            | Self::Validation { message }
            | Self::Transport { message }
            | Self::Translation { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for failures where the upstream was never reached or never answered.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
