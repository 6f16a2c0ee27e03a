mod ollama;

pub use ollama::OllamaEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::error::{ProviderError, Result};

pub const DEFAULT_EMBED_ENDPOINT: &str = "http://localhost:11434";

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;
    fn dimensions(&self) -> usize;
    async fn health_check(&self) -> std::result::Result<(), ProviderError>;
}

/// Embed `text` and reject a vector whose length differs from the
/// embedder's configured dimensions.
pub async fn embed_checked(
    embedder: &dyn Embedder,
    text: &str,
) -> std::result::Result<Vec<f32>, ProviderError> {
    let vector = embedder.embed(text).await?;
    let expected = embedder.dimensions();
    if vector.len() != expected {
        return Err(ProviderError::malformed(
            "embedder",
            format!(
                "embedding has {} dimensions, expected {}; set search.dimensions to match the embedding model",
                vector.len(),
                expected
            ),
        ));
    }
    Ok(vector)
}

pub fn create_embedder(config: &SearchConfig) -> Result<Arc<dyn Embedder>> {
    let endpoint = config
        .endpoint
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBED_ENDPOINT.to_string());
    Ok(Arc::new(OllamaEmbedder::new(
        &endpoint,
        &config.embed_model,
        config.dimensions,
    )?))
}
