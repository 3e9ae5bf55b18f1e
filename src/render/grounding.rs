//! Grounding checks for generated text
//!
//! Rules-based check run on every generated answer before it is shown.
//! Any failed rule rejects the text; the renderer then uses the template.

use crate::generation::GroundingFacts;
use crate::models::{round_money, Scope};
use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, info};

lazy_static! {
    static ref NUMERAL: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid numeral regex");
    static ref WELL_GROUPED: Regex =
        Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").expect("valid grouping regex");
}

/// Trait for grounding rules
pub trait GroundingRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, text: &str, facts: &GroundingFacts) -> RuleOutcome;
}

pub struct RuleOutcome {
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingReport {
    pub grounded: bool,
    pub issues: Vec<String>,
}

pub struct GroundingEngine {
    rules: Vec<Box<dyn GroundingRule>>,
}

impl GroundingEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn GroundingRule>) {
        self.rules.push(rule);
    }

    pub fn check(&self, text: &str, facts: &GroundingFacts) -> GroundingReport {
        let issues: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let outcome = rule.check(text, facts);
                debug!(rule = rule.name(), passed = outcome.passed, "Grounding rule evaluated");
                (!outcome.passed).then(|| format!("{}: {}", rule.name(), outcome.details))
            })
            .collect();

        let grounded = issues.is_empty();
        info!(rule_count = self.rules.len(), grounded, "Grounding check completed");

        GroundingReport { grounded, issues }
    }
}

impl Default for GroundingEngine {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Rules =================
//

/// Rule: the answer must say something
pub struct NonEmptyRule;

impl GroundingRule for NonEmptyRule {
    fn name(&self) -> &'static str {
        "non_empty"
    }

    fn check(&self, text: &str, _facts: &GroundingFacts) -> RuleOutcome {
        let passed = !text.trim().is_empty();
        RuleOutcome {
            passed,
            details: if passed { "ok".into() } else { "empty answer".into() },
        }
    }
}

/// Rule: every numeral in the answer must come from the facts
pub struct NumeralsGroundedRule;

impl GroundingRule for NumeralsGroundedRule {
    fn name(&self) -> &'static str {
        "numerals_grounded"
    }

    fn check(&self, text: &str, facts: &GroundingFacts) -> RuleOutcome {
        let allowed = grounded_numerals(facts);
        let strays = ungrounded_numerals(text, &allowed);

        RuleOutcome {
            passed: strays.is_empty(),
            details: if strays.is_empty() {
                "all numerals traced to report data".into()
            } else {
                format!("untraceable numerals: {}", strays.join(", "))
            },
        }
    }
}

pub fn create_default_grounding_engine() -> GroundingEngine {
    let mut engine = GroundingEngine::new();
    engine.add_rule(Box::new(NonEmptyRule));
    engine.add_rule(Box::new(NumeralsGroundedRule));
    engine
}

//
// ================= Numeral Sets =================
//

/// Every value the facts can legitimately be quoted as, normalized
pub fn grounded_numerals(facts: &GroundingFacts) -> BTreeSet<Decimal> {
    let mut allowed = BTreeSet::new();

    let totals = &facts.aggregates;
    for value in [totals.total_profit, totals.total_loss, totals.net] {
        insert_money(&mut allowed, value);
    }
    allowed.insert(Decimal::from(totals.profit_count));
    allowed.insert(Decimal::from(totals.loss_count));

    for category in &facts.examples {
        allowed.insert(Decimal::from(category.remaining));
        for record in &category.records {
            insert_money(&mut allowed, record.amount());
            insert_date(&mut allowed, record.date());
            allowed.extend(numerals_in(record.details()));
        }
    }

    match facts.scope {
        Scope::Date { date } => insert_date(&mut allowed, date),
        Scope::Month { month, year } => {
            allowed.insert(Decimal::from(month));
            if let Some(year) = year {
                allowed.insert(Decimal::from(year));
            }
        }
        Scope::All => {}
    }

    for month in &facts.monthly {
        allowed.insert(Decimal::from(month.year));
        allowed.insert(Decimal::from(month.month));
        insert_money(&mut allowed, month.profit);
        insert_money(&mut allowed, month.loss);
        insert_money(&mut allowed, month.profit - month.loss);
    }

    allowed
}

/// Exact and two-decimal forms
fn insert_money(set: &mut BTreeSet<Decimal>, value: Decimal) {
    set.insert(value.abs().normalize());
    set.insert(round_money(value).abs().normalize());
}

fn insert_date(set: &mut BTreeSet<Decimal>, date: chrono::NaiveDate) {
    set.insert(Decimal::from(date.year()));
    set.insert(Decimal::from(date.month()));
    set.insert(Decimal::from(date.day()));
}

/// `None` for misgrouped forms such as `25,00`
fn parse_numeral(raw: &str) -> Option<Decimal> {
    if !WELL_GROUPED.is_match(raw) {
        return None;
    }
    Decimal::from_str(&raw.replace(',', "")).ok().map(|d| d.normalize())
}

fn numerals_in(text: &str) -> Vec<Decimal> {
    NUMERAL
        .find_iter(text)
        .filter_map(|m| parse_numeral(m.as_str()))
        .collect()
}

/// Numerals in `text` with no counterpart in `allowed`, as written
pub fn ungrounded_numerals(text: &str, allowed: &BTreeSet<Decimal>) -> Vec<String> {
    NUMERAL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(','))
        .filter(|raw| parse_numeral(raw).map_or(true, |value| !allowed.contains(&value)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinancialRecord, QueryIntent, RecordType};
    use crate::query::ReportEngine;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn facts() -> GroundingFacts {
        let records = vec![
            FinancialRecord::new(
                RecordType::Profit,
                dec!(2500),
                NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                "sold 2 bikes",
            )
            .unwrap(),
            FinancialRecord::new(
                RecordType::Loss,
                dec!(3.14159),
                NaiveDate::from_ymd_opt(2024, 3, 16).unwrap(),
                "",
            )
            .unwrap(),
        ];
        let result = ReportEngine::run(&QueryIntent::default(), &records);
        GroundingFacts::from_report(&result, 3)
    }

    #[test]
    fn test_grounded_text_passes() {
        let engine = create_default_grounding_engine();
        let text = "You made 2,500.00 in profit on 2024-03-15 (sold 2 bikes) and lost 3.14, \
                    for a net of 2,496.86 across 1 profit and 1 loss.";
        let report = engine.check(text, &facts());
        assert!(report.grounded, "{:?}", report.issues);
    }

    #[test]
    fn test_invented_numeral_rejected() {
        let engine = create_default_grounding_engine();
        let report = engine.check("Your profit was roughly 2,600 this month.", &facts());
        assert!(!report.grounded);
        assert!(report.issues[0].contains("2,600"));
    }

    #[test]
    fn test_empty_text_rejected() {
        let report = create_default_grounding_engine().check("   ", &facts());
        assert!(!report.grounded);
        assert!(report.issues[0].starts_with("non_empty"));
    }

    #[test]
    fn test_numeral_forms_compare_by_value() {
        let allowed = grounded_numerals(&facts());
        assert!(ungrounded_numerals("2500 or 2,500 or 2500.00 or 3.14159", &allowed).is_empty());
        assert_eq!(ungrounded_numerals("about 7 days, 2500.", &allowed), vec!["7"]);
    }

    #[test]
    fn test_misgrouped_numerals_are_ungrounded() {
        let allowed = grounded_numerals(&facts());
        assert_eq!(ungrounded_numerals("25,00 and 2,5,0,0", &allowed), vec!["25,00", "2,5,0,0"]);
        assert!(ungrounded_numerals("2,500.00", &allowed).is_empty());
    }
}
