use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, CompletionProvider};
use crate::config::ResolvedProvider;
use crate::error::{ProviderError, Result};

const NAME: &str = "ollama";

/// Local inference through an Ollama server's `/api/generate`.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    temperature: f32,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &ResolvedProvider) -> Result<Self> {
        // "ollama/llama3.2" and "llama3.2" name the same local model
        let model = config
            .model
            .strip_prefix("ollama/")
            .unwrap_or(&config.model)
            .to_string();

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "ollama generate");

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, &self.endpoint, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(NAME, response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(NAME, e.to_string()))?;

        let text = body.response.trim();
        if text.is_empty() {
            return Err(ProviderError::malformed(NAME, "empty response"));
        }
        Ok(text.to_string())
    }
}
