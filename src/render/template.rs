//! Deterministic report text
//!
//! Built only from `GroundingFacts`, so it passes the grounding check by
//! construction.

use crate::generation::{CategoryExamples, GroundingFacts};
use crate::models::{format_money, FinancialRecord, RecordType, Scope, Shape};
use std::fmt::Write;

pub const NO_MATCHES: &str = "No matching records found.";

pub fn render_template(shape: Shape, facts: &GroundingFacts) -> String {
    let mut lines = vec![period_line(&facts.scope, &facts.period)];

    if facts.is_empty() {
        lines.push(NO_MATCHES.to_string());
        return lines.join("\n");
    }

    if shape.includes_aggregates() {
        lines.push("Summary:".to_string());
        lines.extend(summary_lines(facts));
    }

    if !facts.monthly.is_empty() {
        lines.push("Monthly breakdown:".to_string());
        for month in &facts.monthly {
            lines.push(format!(
                "- {}: profit {}, loss {}, net {}",
                month.label(),
                format_money(month.profit),
                format_money(month.loss),
                format_money(month.profit - month.loss)
            ));
        }
    }

    if shape.includes_listing() {
        for category in &facts.examples {
            // Listing-only answers still carry one total line per category
            if shape.includes_aggregates() {
                lines.push(format!("{} details:", heading(category.record_type)));
            } else {
                lines.push(total_line(facts, category.record_type));
            }
            lines.extend(listing_lines(category));
        }
    }

    lines.join("\n")
}

fn period_line(scope: &Scope, label: &str) -> String {
    match scope {
        Scope::Date { .. } => format!("Date: {}", label),
        _ => format!("Period: {}", label),
    }
}

/// Bullets for populated categories only; net needs both
fn summary_lines(facts: &GroundingFacts) -> Vec<String> {
    let mut lines: Vec<String> = facts
        .examples
        .iter()
        .map(|c| format!("- {}", total_line(facts, c.record_type)))
        .collect();

    if facts.aggregates.profit_count > 0 && facts.aggregates.loss_count > 0 {
        lines.push(format!("- Net: {}", format_money(facts.aggregates.net)));
    }
    lines
}

/// `Total profit: 2,500.00 (5 records)`
fn total_line(facts: &GroundingFacts, record_type: RecordType) -> String {
    let (total, count) = facts.category_totals(record_type);
    format!(
        "Total {}: {} ({} {})",
        record_type,
        format_money(total),
        count,
        if count == 1 { "record" } else { "records" }
    )
}

fn listing_lines(category: &CategoryExamples) -> Vec<String> {
    let mut lines: Vec<String> = category.records.iter().map(item_line).collect();
    if category.remaining > 0 {
        lines.push(format!("…and {} more", category.remaining));
    }
    lines
}

/// `- 2024-03-01: 500.00 (sold old items)`
fn item_line(record: &FinancialRecord) -> String {
    let mut line = format!(
        "- {}: {}",
        record.date().format("%Y-%m-%d"),
        format_money(record.amount())
    );
    if !record.details().is_empty() {
        let _ = write!(line, " ({})", record.details());
    }
    line
}

fn heading(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Profit => "Profit",
        RecordType::Loss => "Loss",
    }
}
