use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub provider: Provider,
    pub model: String,
    pub ollama_url: String,
    pub lmstudio_url: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: "qwen:8b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            lmstudio_url: "http://localhost:1234".to_string(),
            timeout_secs: 60,
            temperature: 0.1,
        }
    }
}

impl UserConfig {
    pub fn base_url_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::Ollama => &self.ollama_url,
            Provider::LmStudio => &self.lmstudio_url,
        }
    }
}

pub struct ConfigManager {
    config: UserConfig,
}

impl ConfigManager {
    const CONFIG_FILE: &'static str = ".sigscout.yml";

    /// Load `.sigscout.yml` from the working directory, then the home
    /// directory. No file means all defaults; a malformed file is an
    /// input error.
    pub fn load() -> Result<Self> {
        let config = match Self::config_path() {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => UserConfig::default(),
        };

        Ok(Self { config })
    }

    fn config_path() -> Option<PathBuf> {
        let local = PathBuf::from(Self::CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::home_dir()
            .map(|home| home.join(Self::CONFIG_FILE))
            .filter(|path| path.exists())
    }

    /// Effective config: file values with SIGSCOUT_* environment
    /// overrides applied. CLI flags override both at the call site.
    pub fn get(&self) -> UserConfig {
        let mut config = self.config.clone();

        if let Ok(provider) = std::env::var("SIGSCOUT_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "ollama" => config.provider = Provider::Ollama,
                "lmstudio" => config.provider = Provider::LmStudio,
                _ => {}
            }
        }
        if let Ok(model) = std::env::var("SIGSCOUT_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("SIGSCOUT_OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Ok(url) = std::env::var("SIGSCOUT_LMSTUDIO_URL") {
            config.lmstudio_url = url;
        }
        if let Ok(timeout) = std::env::var("SIGSCOUT_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse() {
                config.timeout_secs = timeout;
            }
        }
        if let Ok(temperature) = std::env::var("SIGSCOUT_TEMPERATURE") {
            if let Ok(temperature) = temperature.parse() {
                config.temperature = temperature;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = UserConfig::default();
        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.model, "qwen:8b");
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.lmstudio_url, "http://localhost:1234");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults_for_the_rest() {
        let config: UserConfig =
            serde_yaml::from_str("provider: lmstudio\nmodel: llama3\n").unwrap();
        assert_eq!(config.provider, Provider::LmStudio);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.lmstudio_url, "http://localhost:1234");
    }

    #[test]
    fn test_base_url_selection_follows_provider() {
        let config = UserConfig::default();
        assert_eq!(config.base_url_for(Provider::Ollama), "http://localhost:11434");
        assert_eq!(config.base_url_for(Provider::LmStudio), "http://localhost:1234");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let result: Result<UserConfig, _> = serde_yaml::from_str("provider: [not, a, string]");
        assert!(result.is_err());
    }
}
