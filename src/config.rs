use crate::error::{ProxyError, Result};
use crate::providers::{ApiFormat, ProviderPreset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for every path that is not an API route.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Upper bound on one upstream call. Unset means the call may wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_provider_name() -> String {
    "gemini".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
            request_timeout_secs: None,
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            api_key_env: None,
            model: None,
            format: None,
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir. With no file anywhere
    /// the built-in defaults are used.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn preset(&self) -> Option<&'static ProviderPreset> {
        ProviderPreset::from_name(&self.provider.name)
    }

    /// Resolve the effective base URL (config override or provider preset default)
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.provider.base_url {
            return Ok(url.clone());
        }

        self.preset()
            .map(|p| p.base_url.to_string())
            .ok_or_else(|| {
                ProxyError::config(format!(
                    "Unknown provider '{}' and no base_url configured. Known providers: {}",
                    self.provider.name,
                    known_providers()
                ))
            })
    }

    /// Wire format: explicit `format` first, then the preset's.
    pub fn api_format(&self) -> Result<ApiFormat> {
        if let Some(ref fmt) = self.provider.format {
            return ApiFormat::from_name(fmt)
                .ok_or_else(|| ProxyError::config(format!("Unknown provider format '{fmt}'")));
        }

        self.preset().map(|p| p.format).ok_or_else(|| {
            ProxyError::config(format!(
                "Provider '{}' has no preset; set provider.format to gemini or openai",
                self.provider.name
            ))
        })
    }

    pub fn effective_model(&self) -> Result<String> {
        if let Some(ref model) = self.provider.model {
            return Ok(model.clone());
        }

        self.preset()
            .map(|p| p.default_model.to_string())
            .ok_or_else(|| {
                ProxyError::config(format!(
                    "Provider '{}' has no preset; set provider.model",
                    self.provider.name
                ))
            })
    }

    /// Name of the environment variable holding the API key.
    #[must_use]
    pub fn api_key_env(&self) -> String {
        self.provider
            .api_key_env
            .clone()
            .or_else(|| self.preset().map(|p| p.default_api_key_env.to_string()))
            .unwrap_or_else(|| "API_KEY".to_string())
    }

    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String> {
        let var = self.api_key_env();
        match std::env::var(&var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ProxyError::config(format!(
                "Environment variable '{var}' not set. Set it with your provider API key."
            ))),
        }
    }
}

fn known_providers() -> String {
    ProviderPreset::all()
        .iter()
        .map(|p| p.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Config file locations, in search order.
#[must_use]
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("chat-proxy.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("chat-proxy").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("chat-proxy").join("config.toml"));
        paths.push(home.join(".chat-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn provider(name: &str) -> ProxyConfig {
        ProxyConfig {
            provider: ProviderConfig {
                name: name.to_string(),
                ..ProviderConfig::default()
            },
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000
static_dir = "public"

[provider]
name = "openai"
api_key_env = "MY_OPENAI_KEY"
model = "gpt-4o-mini"
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.provider.name, "openai");
        assert_eq!(config.api_key_env(), "MY_OPENAI_KEY");
        assert_eq!(config.effective_model().unwrap(), "gpt-4o-mini");
        assert_eq!(config.api_format().unwrap(), ApiFormat::OpenAi);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.provider.name, "gemini");
        assert_eq!(config.api_key_env(), "GEMINI_API_KEY");
        assert_eq!(config.effective_model().unwrap(), "gemini-pro");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ProxyConfig::find_and_load(Some(Path::new("/nonexistent/chat-proxy.toml")))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Config { .. }));
    }

    #[test]
    fn test_effective_base_url_from_preset() {
        let url = provider("gemini").effective_base_url().unwrap();
        assert_eq!(url, "https://generativelanguage.googleapis.com/v1beta");
    }

    #[test]
    fn test_effective_base_url_override() {
        let mut config = provider("custom");
        config.provider.base_url = Some("http://127.0.0.1:9000".to_string());
        assert_eq!(config.effective_base_url().unwrap(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_unknown_provider_without_overrides() {
        let config = provider("custom");
        let err = config.effective_base_url().unwrap_err();
        assert!(err.to_string().contains("Known providers: gemini, openai"));
        assert!(config.api_format().is_err());
        assert!(config.effective_model().is_err());
        assert_eq!(config.api_key_env(), "API_KEY");
    }

    #[test]
    fn test_explicit_format_wins() {
        let mut config = provider("gemini");
        config.provider.format = Some("openai".to_string());
        assert_eq!(config.api_format().unwrap(), ApiFormat::OpenAi);

        config.provider.format = Some("soap".to_string());
        assert!(config.api_format().is_err());
    }

    #[test]
    fn test_resolve_api_key() {
        let mut config = provider("gemini");
        config.provider.api_key_env = Some("CHAT_PROXY_TEST_RESOLVE_KEY".to_string());

        std::env::remove_var("CHAT_PROXY_TEST_RESOLVE_KEY");
        assert!(config.resolve_api_key().is_err());

        std::env::set_var("CHAT_PROXY_TEST_RESOLVE_KEY", "   ");
        assert!(config.resolve_api_key().is_err());

        std::env::set_var("CHAT_PROXY_TEST_RESOLVE_KEY", "sk-test");
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
        std::env::remove_var("CHAT_PROXY_TEST_RESOLVE_KEY");
    }
}
