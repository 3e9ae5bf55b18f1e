//! Text generation collaborator
//!
//! One narrow capability, `generate(prompt, facts)`. Concrete backends are
//! interchangeable adapters selected by configuration.

pub mod chat_completions;
pub mod gemini;

pub use chat_completions::ChatCompletionsGenerator;
pub use gemini::GeminiGenerator;

use crate::config::{GenerationConfig, LlmBackend};
use crate::models::{
    Aggregates, FinancialRecord, MonthlyTotals, RecordType, ReportResult, Scope, TypeFilter,
};
use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const SAMPLING_TEMPERATURE: f32 = 0.3;

/// System instruction shared by every backend
pub const GROUNDED_SYSTEM_PROMPT: &str = r#"You are a bookkeeping assistant that explains a profit/loss report.

Rules:
- Use ONLY the numbers and facts in the supplied report data
- Never invent, estimate, round differently or recompute any number
- Never mention dates, amounts or counts that are not in the data
- If the data has no records, say so plainly
- Be brief: a few sentences or short bullet points"#;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, facts: &GroundingFacts) -> Result<String>;
}

//
// ================= Grounding Facts =================
//

/// Up to `example_limit` records of one category, plus how many were left out
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryExamples {
    pub record_type: RecordType,
    pub records: Vec<FinancialRecord>,
    pub remaining: usize,
}

/// Everything the renderer is allowed to say
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroundingFacts {
    pub period: String,
    pub scope: Scope,
    pub type_filter: TypeFilter,
    pub aggregates: Aggregates,
    pub examples: Vec<CategoryExamples>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monthly: Vec<MonthlyTotals>,
}

impl GroundingFacts {
    /// Pre-truncate a report; aggregates still cover every matched record.
    pub fn from_report(result: &ReportResult, example_limit: usize) -> Self {
        let examples = [RecordType::Profit, RecordType::Loss]
            .into_iter()
            .filter(|kind| result.type_filter.matches(*kind))
            .filter_map(|kind| {
                let all: Vec<&FinancialRecord> = result.of_type(kind).collect();
                if all.is_empty() {
                    return None;
                }
                Some(CategoryExamples {
                    record_type: kind,
                    records: all.iter().take(example_limit).map(|r| (*r).clone()).collect(),
                    remaining: all.len().saturating_sub(example_limit),
                })
            })
            .collect();

        Self {
            period: result.scope.label(),
            scope: result.scope,
            type_filter: result.type_filter,
            aggregates: result.aggregates.clone(),
            examples,
            monthly: result.monthly.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn category(&self, record_type: RecordType) -> Option<&CategoryExamples> {
        self.examples.iter().find(|c| c.record_type == record_type)
    }

    /// Total and count for one category
    pub fn category_totals(&self, record_type: RecordType) -> (Decimal, usize) {
        match record_type {
            RecordType::Profit => (self.aggregates.total_profit, self.aggregates.profit_count),
            RecordType::Loss => (self.aggregates.total_loss, self.aggregates.loss_count),
        }
    }
}

/// Pick the configured backend. `Ok(None)` means template-only rendering.
pub fn build_generator(config: &GenerationConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    let generator: Arc<dyn TextGenerator> = match config.backend {
        LlmBackend::Template => return Ok(None),
        LlmBackend::Gemini => Arc::new(GeminiGenerator::from_config(config)?),
        LlmBackend::Groq | LlmBackend::OpenAi | LlmBackend::Ollama => {
            Arc::new(ChatCompletionsGenerator::from_config(config)?)
        }
    };

    info!(backend = generator.name(), "Text generator configured");
    Ok(Some(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryIntent;
    use crate::query::ReportEngine;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn generate(&self, _prompt: &str, facts: &GroundingFacts) -> Result<String> {
            Ok(facts.period.clone())
        }
    }

    fn records(n: u32) -> Vec<FinancialRecord> {
        (1..=n)
            .map(|d| {
                FinancialRecord::new(
                    RecordType::Profit,
                    dec!(10),
                    NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    "",
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_facts_are_pre_truncated() {
        let result = ReportEngine::run(&QueryIntent::default(), &records(5));
        let facts = GroundingFacts::from_report(&result, 3);

        let profit = facts.category(RecordType::Profit).unwrap();
        assert_eq!(profit.records.len(), 3);
        assert_eq!(profit.remaining, 2);
        assert!(facts.category(RecordType::Loss).is_none());
        assert_eq!(facts.category_totals(RecordType::Profit), (dec!(50), 5));
    }

    #[test]
    fn test_trait_object_dispatch() {
        let generator: Arc<dyn TextGenerator> = Arc::new(EchoGenerator);
        let result = ReportEngine::run(&QueryIntent::default(), &records(1));
        let facts = GroundingFacts::from_report(&result, 3);

        let text = tokio_test::block_on(generator.generate("prompt", &facts)).unwrap();
        assert_eq!(text, "All time");
    }

    #[test]
    fn test_template_backend_builds_nothing() {
        let config = GenerationConfig {
            backend: LlmBackend::Template,
            api_key: None,
            model: None,
            base_url: None,
            timeout: Duration::from_secs(15),
        };
        assert!(build_generator(&config).unwrap().is_none());
    }
}
