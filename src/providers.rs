//! Built-in upstream presets.
//!
//! A preset fixes the base URL, wire format, default model and the environment
//! variable the API key is read from. Config only has to name the provider.

use std::fmt;

/// Wire format spoken by an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    /// `models/{model}:generateContent`, key in the `key` query parameter.
    Gemini,
    /// `chat/completions`, key as a bearer token.
    OpenAi,
}

impl ApiFormat {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl fmt::Display for ApiFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderPreset {
    pub name: &'static str,
    pub base_url: &'static str,
    pub format: ApiFormat,
    pub default_model: &'static str,
    pub default_api_key_env: &'static str,
}

const PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        name: "gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        format: ApiFormat::Gemini,
        default_model: "gemini-pro",
        default_api_key_env: "GEMINI_API_KEY",
    },
    ProviderPreset {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        format: ApiFormat::OpenAi,
        default_model: "gpt-3.5-turbo",
        default_api_key_env: "OPENAI_API_KEY",
    },
];

impl ProviderPreset {
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static ProviderPreset> {
        PRESETS.iter().find(|p| p.name == name.to_lowercase())
    }

    #[must_use]
    pub fn all() -> &'static [ProviderPreset] {
        PRESETS
    }
}
