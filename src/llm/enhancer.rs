use std::sync::Arc;
use tracing::debug;

use super::prompt::{enhance_prompt, parse_sections};
use super::CompletionProvider;
use crate::error::Result;
use crate::types::{CodeUnit, EnhancementResult};

/// Generates summary, explanation and example text for code units.
pub struct Enhancer {
    provider: Arc<dyn CompletionProvider>,
}

impl Enhancer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// One provider call per unit; nothing is cached between calls.
    pub async fn enhance(&self, unit: &CodeUnit, language: &str) -> Result<EnhancementResult> {
        let prompt = enhance_prompt(unit, language);
        debug!(
            unit = %unit.qualified_name,
            provider = self.provider.name(),
            model = self.provider.model(),
            "requesting enhancement"
        );

        let reply = self.provider.complete(&prompt).await?;
        let sections = parse_sections(self.provider.name(), &reply)?;

        Ok(EnhancementResult {
            summary: sections.summary,
            explanation: sections.explanation,
            example: sections.example,
            language: language.to_string(),
        })
    }
}
