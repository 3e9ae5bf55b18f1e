//! Question → `QueryIntent`
//!
//! Never fails: anything it cannot read degrades to the widest intent
//! (all time, both types, full report).

use crate::models::{QueryIntent, Scope, Shape, TypeFilter};
use crate::parsing::{month_from_name, parse_explicit_date, MONTH_ALTERNATION};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

const PROFIT_TERMS: &[&str] = &[
    "profit", "profits", "gain", "gains", "income", "revenue",
    "earn", "earned", "earning", "earnings", "made",
];

const LOSS_TERMS: &[&str] = &[
    "loss", "losses", "expense", "expenses",
    "spent", "spend", "spending", "lost",
];

/// Ask for aggregates
const AGGREGATE_CUES: &[&str] = &[
    "report", "summary", "summarize", "summarise", "overview", "total", "totals", "net",
];

/// Ask for the matched records
const LISTING_CUES: &[&str] = &[
    "details", "detail", "list", "show", "transactions", "records", "entries",
];

const MONTHLY_PHRASES: &[&str] = &["monthly", "by month", "per month", "each month"];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z]+").expect("valid word regex");
    static ref MONTH: Regex = Regex::new(&format!(r"(?i)\b({})\b", MONTH_ALTERNATION))
        .expect("valid month regex");
    static ref YEAR: Regex = Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year regex");
    /// "May I ..." is a request, not a month
    static ref MODAL_MAY: Regex =
        Regex::new(r"(?i)\bmay\s+(?:i|we|you)\b").expect("valid modal regex");
}

/// Question parser
pub struct QueryIntentParser;

impl QueryIntentParser {
    pub fn parse(question: &str) -> QueryIntent {
        let lower = question.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
        let has_any = |set: &[&str]| words.iter().any(|w| set.contains(w));

        let scope = resolve_scope(question);

        let type_filter = match (has_any(PROFIT_TERMS), has_any(LOSS_TERMS)) {
            (true, false) => TypeFilter::Profit,
            (false, true) => TypeFilter::Loss,
            _ => TypeFilter::Both,
        };

        let wants_aggregates = has_any(AGGREGATE_CUES) || lower.contains("how much");
        let wants_listing = has_any(LISTING_CUES);
        let shape = match (wants_aggregates, wants_listing) {
            (true, false) => Shape::Summary,
            (false, true) => Shape::Listing,
            _ => Shape::FullReport,
        };

        let monthly_breakdown = MONTHLY_PHRASES.iter().any(|p| lower.contains(p));

        let intent = QueryIntent {
            scope,
            type_filter,
            shape,
            monthly_breakdown,
        };
        debug!(?intent, "Parsed question");
        intent
    }
}

/// Explicit numeric date first, then a month name (optional year), else all time.
/// Relative words like "today" are deliberately not resolved here.
fn resolve_scope(question: &str) -> Scope {
    if let Some((date, _)) = parse_explicit_date(question) {
        return Scope::Date { date };
    }

    let month = MONTH
        .find_iter(question)
        .filter(|m| !MODAL_MAY.find_iter(question).any(|modal| modal.start() == m.start()))
        .find_map(|m| month_from_name(m.as_str()));

    match month {
        Some(month) => Scope::Month {
            month,
            year: YEAR
                .captures(question)
                .and_then(|c| c.get(1))
                .and_then(|y| y.as_str().parse().ok()),
        },
        None => Scope::All,
    }
}
