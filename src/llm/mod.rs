mod anthropic;
mod enhancer;
mod ollama;
mod openai;
pub mod prompt;
mod translator;

pub use anthropic::AnthropicProvider;
pub use enhancer::Enhancer;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use translator::Translator;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ProviderKind, ResolvedProvider};
use crate::error::{ProviderError, Result};

/// A backend that answers single-prompt completion requests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

pub fn create_provider(config: &ResolvedProvider) -> Result<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match config.kind {
        ProviderKind::Local => Arc::new(OllamaProvider::new(config)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
    };
    Ok(provider)
}

fn http_client(config: &ResolvedProvider) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| {
            crate::error::DocError::config(format!("failed to create HTTP client: {}", e))
        })
}
