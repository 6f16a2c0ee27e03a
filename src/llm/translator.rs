use std::sync::Arc;
use tracing::debug;

use super::prompt::{strip_fence, translate_code_prompt, translate_prompt};
use super::CompletionProvider;
use crate::error::{ProviderError, Result};
use crate::types::EnhancementResult;

/// Translates generated documentation through the same provider channel
/// used for enhancement.
pub struct Translator {
    provider: Arc<dyn CompletionProvider>,
}

impl Translator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        debug!(target_language, chars = text.len(), "translating text");
        let reply = self
            .provider
            .complete(&translate_prompt(text, target_language))
            .await?;
        self.unwrap_reply(&reply)
    }

    /// Translate comments and prose inside example code, leaving code intact.
    pub async fn translate_code(&self, code: &str, target_language: &str) -> Result<String> {
        if code.trim().is_empty() {
            return Ok(String::new());
        }
        let reply = self
            .provider
            .complete(&translate_code_prompt(code, target_language))
            .await?;
        self.unwrap_reply(&reply)
    }

    /// Translate the generated fields of `result` and record the new language.
    pub async fn translate_result(
        &self,
        result: &EnhancementResult,
        target_language: &str,
    ) -> Result<EnhancementResult> {
        if result.language.eq_ignore_ascii_case(target_language) {
            return Ok(result.clone());
        }

        Ok(EnhancementResult {
            summary: self.translate(&result.summary, target_language).await?,
            explanation: self.translate(&result.explanation, target_language).await?,
            example: self.translate_code(&result.example, target_language).await?,
            language: target_language.to_string(),
        })
    }

    fn unwrap_reply(&self, reply: &str) -> Result<String> {
        let trimmed = reply.trim();
        // A reply wrapped entirely in one fence is unwrapped.
        let text = if trimmed.starts_with("```") && trimmed.ends_with("```") {
            strip_fence(trimmed)
        } else {
            trimmed.to_string()
        };
        if text.is_empty() {
            return Err(ProviderError::malformed(self.provider.name(), "empty translation").into());
        }
        Ok(text)
    }
}
