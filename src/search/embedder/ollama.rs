use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Embedder;
use crate::error::{DocError, ProviderError, Result};

const NAME: &str = "ollama";

pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    client: Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaEmbedder {
    pub fn new(endpoint: &str, model: &str, dimensions: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DocError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            client,
        })
    }

    fn unreachable(&self, err: reqwest::Error) -> ProviderError {
        if err.is_connect() || err.is_timeout() {
            ProviderError::Unreachable {
                provider: NAME.to_string(),
                endpoint: self.endpoint.clone(),
                reason: format!("{}. Is Ollama running? Start it with `ollama serve`", err),
            }
        } else {
            ProviderError::from_reqwest(NAME, &self.endpoint, err)
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed(NAME, "no embedding returned"))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            truncate: true,
        };
        debug!(model = %self.model, count = texts.len(), "ollama embed");

        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !response.status().is_success() {
            let err = ProviderError::from_response(NAME, response).await;
            if let ProviderError::Http { status, body, .. } = &err {
                if *status == 404 || body.contains("not found") {
                    return Err(ProviderError::Http {
                        provider: NAME.to_string(),
                        status: *status,
                        body: format!(
                            "model '{}' not found. Pull it with: ollama pull {}",
                            self.model, self.model
                        ),
                    });
                }
            }
            return Err(err);
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(NAME, e.to_string()))?;

        if body.embeddings.len() != texts.len() {
            return Err(ProviderError::malformed(
                NAME,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    body.embeddings.len()
                ),
            ));
        }
        Ok(body.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> std::result::Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(NAME, response).await);
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(NAME, e.to_string()))?;
        let model_available = tags
            .models
            .iter()
            .any(|m| m.name.starts_with(&self.model) || m.name == format!("{}:latest", self.model));

        if !model_available {
            return Err(ProviderError::Http {
                provider: NAME.to_string(),
                status: 404,
                body: format!(
                    "model '{}' not installed. Pull it with: ollama pull {}",
                    self.model, self.model
                ),
            });
        }

        Ok(())
    }
}
