use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    LmStudio,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama",
            Provider::LmStudio => "LM Studio",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    config: ProviderConfig,
    client: reqwest::Client,
    debug: bool,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            debug: std::env::var("SIGSCOUT_DEBUG").is_ok(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One synchronous request, no retries, no streaming. Network and
    /// HTTP-status failures are fatal; a 2xx body that does not match
    /// the provider envelope is passed through raw so the caller can
    /// still salvage or display it.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        match self.config.provider {
            Provider::Ollama => self.complete_ollama(system, prompt).await,
            Provider::LmStudio => self.complete_lmstudio(system, prompt).await,
        }
    }

    async fn complete_ollama(&self, system: &str, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let url = self.endpoint_url();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await
            .with_context(|| {
                format!("Failed to reach Ollama at {url}. Is the Ollama server running?")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            let error_msg = match status.as_u16() {
                404 => format!(
                    "Model '{}' not found on Ollama. Pull it first: ollama pull {}",
                    self.config.model, self.config.model
                ),
                500..=599 => format!("Ollama server error ({status}): {error_text}"),
                _ => format!("Ollama API error ({status}): {error_text}"),
            };

            anyhow::bail!("{}", error_msg);
        }

        let body = response.text().await.context("Failed to read Ollama response")?;

        match serde_json::from_str::<OllamaResponse>(&body) {
            Ok(parsed) => Ok(parsed.response),
            Err(e) => {
                if self.debug {
                    eprintln!("Ollama reply was not the expected envelope: {e}");
                }
                Ok(body)
            }
        }
    }

    async fn complete_lmstudio(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            temperature: self.config.temperature,
        };

        let url = self.endpoint_url();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await
            .with_context(|| {
                format!("Failed to reach LM Studio at {url}. Is the LM Studio server running?")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            let error_msg = match status.as_u16() {
                400 | 404 => format!(
                    "LM Studio rejected the request ({status}). \
                     Check that a model is loaded in the LM Studio server. {error_text}"
                ),
                500..=599 => format!("LM Studio server error ({status}): {error_text}"),
                _ => format!("LM Studio API error ({status}): {error_text}"),
            };

            anyhow::bail!("{}", error_msg);
        }

        let body = response
            .text()
            .await
            .context("Failed to read LM Studio response")?;

        match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) => match parsed.choices.into_iter().next() {
                Some(choice) => Ok(choice.message.content),
                None => {
                    if self.debug {
                        eprintln!("LM Studio reply had no choices");
                    }
                    Ok(body)
                }
            },
            Err(e) => {
                if self.debug {
                    eprintln!("LM Studio reply was not the expected envelope: {e}");
                }
                Ok(body)
            }
        }
    }

    fn endpoint_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            Provider::Ollama => format!("{base}/api/generate"),
            Provider::LmStudio => format!("{base}/v1/chat/completions"),
        }
    }
}
