//! Question answering: intent → report → rendered text

pub mod intent;
pub mod report;

pub use intent::QueryIntentParser;
pub use report::{aggregate, ReportEngine};

use crate::models::{
    Aggregates, FinancialRecord, MonthlyTotals, QueryIntent, ReportResult, Shape, TypeFilter,
};
use crate::render::{RenderSource, ResponseRenderer};
use serde::Serialize;
use tracing::info;

/// Machine-readable side of an answer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StructuredReport {
    pub period: String,
    pub type_filter: TypeFilter,
    pub shape: Shape,
    pub aggregates: Aggregates,
    pub records: Vec<FinancialRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monthly: Vec<MonthlyTotals>,
}

impl StructuredReport {
    fn new(intent: &QueryIntent, result: ReportResult) -> Self {
        Self {
            period: result.scope.label(),
            type_filter: result.type_filter,
            shape: intent.shape,
            aggregates: result.aggregates,
            records: result.matched,
            monthly: result.monthly,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueryAnswer {
    pub text: String,
    pub report: StructuredReport,
    pub source: RenderSource,
}

/// Answer a natural-language question over a read-only record snapshot.
/// Never fails; an unreadable question becomes an all-time report.
pub async fn answer_query(
    question: &str,
    records: &[FinancialRecord],
    renderer: &ResponseRenderer,
) -> QueryAnswer {
    let intent = QueryIntentParser::parse(question);
    let result = ReportEngine::run(&intent, records);
    let rendered = renderer.render(question, &intent, &result).await;

    info!(
        matched = result.matched.len(),
        source = ?rendered.source,
        "Answered question"
    );

    QueryAnswer {
        text: rendered.text,
        report: StructuredReport::new(&intent, result),
        source: rendered.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(kind: RecordType, y: i32, m: u32, d: u32) -> FinancialRecord {
        FinancialRecord::new(kind, dec!(500), NaiveDate::from_ymd_opt(y, m, d).unwrap(), "sale").unwrap()
    }

    #[tokio::test]
    async fn test_march_profit_details() {
        let mut records: Vec<FinancialRecord> =
            (1..=5).map(|d| record(RecordType::Profit, 2024, 3, d)).collect();
        records.push(record(RecordType::Loss, 2024, 3, 9));
        records.push(record(RecordType::Profit, 2024, 4, 1));

        let answer = answer_query(
            "Show me all profit details for March",
            &records,
            &ResponseRenderer::template_only(),
        )
        .await;

        assert!(answer.text.contains("Total profit: 2,500.00"));
        assert_eq!(answer.text.matches("\n- 2024-03-").count(), 3);
        assert!(answer.text.contains("…and 2 more"));
        assert_eq!(answer.report.records.len(), 5);
        assert_eq!(answer.report.aggregates.total_profit, dec!(2500.00));
        assert_eq!(answer.report.period, "March");
        assert_eq!(answer.source, RenderSource::Template);
    }

    #[tokio::test]
    async fn test_gibberish_question_never_fails() {
        let records = vec![record(RecordType::Loss, 2024, 1, 2)];
        let answer = answer_query("wxyz", &records, &ResponseRenderer::template_only()).await;

        assert_eq!(answer.report.period, "All time");
        assert_eq!(answer.report.type_filter, TypeFilter::Both);
        assert_eq!(answer.report.records.len(), 1);

        let answer = answer_query("wxyz", &[], &ResponseRenderer::template_only()).await;
        assert!(answer.text.contains("No matching records found."));
    }

    #[test]
    fn test_answer_json_shape() {
        let records = vec![record(RecordType::Profit, 2024, 3, 1)];
        let answer = tokio_test::block_on(answer_query(
            "profit summary",
            &records,
            &ResponseRenderer::template_only(),
        ));
        let json = serde_json::to_value(&answer).unwrap();

        assert_eq!(json["source"], "template");
        assert_eq!(json["report"]["shape"], "summary");
        assert_eq!(json["report"]["aggregates"]["total_profit"], "500.00");
        assert_eq!(json["report"]["records"][0]["amount"], "500.00");
        assert!(json["report"].get("monthly").is_none());
    }
}
