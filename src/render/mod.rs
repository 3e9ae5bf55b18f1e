//! Response rendering
//!
//! The template is always built first. A configured generator may replace it,
//! but only with text that passes every grounding rule; any failure, timeout
//! or stray numeral falls back to the template.

pub mod grounding;
pub mod template;

pub use grounding::{create_default_grounding_engine, GroundingEngine, GroundingReport};
pub use template::render_template;

use crate::error::LedgerError;
use crate::generation::{GroundingFacts, TextGenerator};
use crate::models::{QueryIntent, ReportResult};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_EXAMPLE_LIMIT: usize = 3;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderSource {
    Template,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub source: RenderSource,
}

pub struct ResponseRenderer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    example_limit: usize,
    grounding: GroundingEngine,
}

impl ResponseRenderer {
    pub fn template_only() -> Self {
        Self {
            generator: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
            example_limit: DEFAULT_EXAMPLE_LIMIT,
            grounding: create_default_grounding_engine(),
        }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            timeout,
            ..Self::template_only()
        }
    }

    /// Records shown per category before "…and N more"
    pub fn example_limit(mut self, limit: usize) -> Self {
        self.example_limit = limit;
        self
    }

    pub fn facts_for(&self, result: &ReportResult) -> GroundingFacts {
        GroundingFacts::from_report(result, self.example_limit)
    }

    pub async fn render(&self, question: &str, intent: &QueryIntent, result: &ReportResult) -> Rendered {
        let facts = self.facts_for(result);
        let template = render_template(intent.shape, &facts);

        let Some(generator) = &self.generator else {
            return Rendered { text: template, source: RenderSource::Template };
        };
        if facts.is_empty() {
            return Rendered { text: template, source: RenderSource::Template };
        }

        match self.generate(generator.as_ref(), question, &facts).await {
            Ok(text) => {
                info!(backend = generator.name(), "Using generated answer");
                Rendered { text, source: RenderSource::Generated }
            }
            Err(e) => {
                warn!(backend = generator.name(), error = %e, "Falling back to template answer");
                Rendered { text: template, source: RenderSource::Template }
            }
        }
    }

    async fn generate(
        &self,
        generator: &dyn TextGenerator,
        question: &str,
        facts: &GroundingFacts,
    ) -> Result<String> {
        let prompt = build_prompt(question, facts)?;

        let text = tokio::time::timeout(self.timeout, generator.generate(&prompt, facts))
            .await
            .map_err(|_| {
                LedgerError::GenerationUnavailable(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| LedgerError::GenerationUnavailable(e.to_string()))?;

        let text = text.trim().to_string();
        let report = self.grounding.check(&text, facts);
        if !report.grounded {
            return Err(LedgerError::GenerationUngrounded(report.issues.join("; ")));
        }

        Ok(text)
    }
}

impl Default for ResponseRenderer {
    fn default() -> Self {
        Self::template_only()
    }
}

/// Question plus the pre-computed report; no other data reaches the model.
pub fn build_prompt(question: &str, facts: &GroundingFacts) -> Result<String> {
    let data = serde_json::to_string_pretty(facts)?;

    Ok(format!(
        "Question: {question}\n\n\
         Report data (already computed, authoritative):\n{data}\n\n\
         Answer the question using only the report data above. \
         Do not use any number or fact that is not in the report data. \
         Quote amounts exactly as they appear. \
         When a category lists remaining records, say how many more there are instead of guessing them."
    ))
}
