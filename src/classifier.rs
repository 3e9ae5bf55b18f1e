//! Transaction Type Classifier
//!
//! Decides whether a statement describes a gain or a loss:
//! - Profit: earned, received, income, made, ...
//! - Loss: spent, paid, lost, expense, ...
//!
//! The answer is never "unknown". When both sets match, a loss indicator wins
//! only if it comes after the profit indicator and sits closer to the amount;
//! otherwise profit wins. No indicator at all also means profit, so plain
//! statements are bookkept as income.

use crate::models::RecordType;
use crate::parsing::span_distance;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

/// Static keyword lists (disjoint)
const PROFIT_KEYWORDS: &[&str] = &[
    "profit", "profits", "profited",
    "earn", "earned", "earning", "earnings",
    "gain", "gains", "gained",
    "income", "revenue",
    "made", "make",
    "receive", "received",
    "won", "credited",
];

const LOSS_KEYWORDS: &[&str] = &[
    "loss", "losses", "lost", "lose",
    "spent", "spend", "spending",
    "paid", "pay",
    "expense", "expenses",
    "cost", "costs",
    "bought", "purchased",
    "debited",
];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\b[A-Za-z]+\b").expect("valid word regex");
}

/// One trigger word found in a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorHit {
    pub span: Range<usize>,
    pub record_type: RecordType,
}

/// How the type was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Only one keyword set matched
    Unambiguous,
    /// Both sets matched and proximity to the amount decided
    TieBreak,
    /// Neither set matched
    Defaulted,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub record_type: RecordType,
    pub resolution: Resolution,
    pub indicators: Vec<IndicatorHit>,
}

/// Every profit/loss trigger word in `text`, in text order
pub fn find_indicators(text: &str) -> Vec<IndicatorHit> {
    WORD.find_iter(text)
        .filter_map(|m| {
            let word = m.as_str().to_lowercase();
            let record_type = if PROFIT_KEYWORDS.contains(&word.as_str()) {
                RecordType::Profit
            } else if LOSS_KEYWORDS.contains(&word.as_str()) {
                RecordType::Loss
            } else {
                return None;
            };
            Some(IndicatorHit { span: m.range(), record_type })
        })
        .collect()
}

/// Profit/loss classifier
pub struct TypeClassifier;

impl TypeClassifier {
    /// Classify a statement. `amount_span` is where the amount was found, if anywhere.
    pub fn classify(text: &str, amount_span: Option<&Range<usize>>) -> Classification {
        let indicators = find_indicators(text);

        let has_profit = indicators.iter().any(|h| h.record_type == RecordType::Profit);
        let has_loss = indicators.iter().any(|h| h.record_type == RecordType::Loss);

        let (record_type, resolution) = match (has_profit, has_loss) {
            (true, false) => (RecordType::Profit, Resolution::Unambiguous),
            (false, true) => (RecordType::Loss, Resolution::Unambiguous),
            (false, false) => (RecordType::Profit, Resolution::Defaulted),
            (true, true) => (break_tie(&indicators, amount_span), Resolution::TieBreak),
        };

        debug!(?record_type, ?resolution, indicator_count = indicators.len(), "Classified statement");

        Classification {
            record_type,
            resolution,
            indicators,
        }
    }
}

/// Both sets matched: loss wins only when its closest indicator appears after
/// the closest profit indicator and is strictly nearer the amount.
fn break_tie(indicators: &[IndicatorHit], amount_span: Option<&Range<usize>>) -> RecordType {
    let Some(amount) = amount_span else {
        return RecordType::Profit;
    };

    let nearest = |kind: RecordType| {
        indicators
            .iter()
            .filter(|h| h.record_type == kind)
            .min_by_key(|h| span_distance(&h.span, amount))
    };

    match (nearest(RecordType::Profit), nearest(RecordType::Loss)) {
        (Some(profit), Some(loss))
            if loss.span.start > profit.span.start
                && span_distance(&loss.span, amount) < span_distance(&profit.span, amount) =>
        {
            RecordType::Loss
        }
        _ => RecordType::Profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_amount;

    fn classify(text: &str) -> Classification {
        let amount = parse_amount(text).map(|m| m.span);
        TypeClassifier::classify(text, amount.as_ref())
    }

    #[test]
    fn test_keyword_sets_are_disjoint() {
        for kw in PROFIT_KEYWORDS {
            assert!(!LOSS_KEYWORDS.contains(kw), "{} in both sets", kw);
        }
    }

    #[test]
    fn test_profit_statements() {
        let cases = vec![
            "I earned $1500 today from freelance work",
            "received 300 dollars from a client",
            "made a profit of $500 on March 15th",
            "Income of $2,000 this month",
        ];

        for c in cases {
            let result = classify(c);
            assert_eq!(result.record_type, RecordType::Profit, "{}", c);
            assert_eq!(result.resolution, Resolution::Unambiguous);
        }
    }

    #[test]
    fn test_loss_statements() {
        let cases = vec![
            "Spent $75 on 12/15/2024 for office supplies",
            "Lost $200 yesterday on groceries",
            "paid 40 dollars for the electricity bill",
            "Office expense of $90",
        ];

        for c in cases {
            assert_eq!(classify(c).record_type, RecordType::Loss, "{}", c);
        }
    }

    #[test]
    fn test_tie_break_loss_after_and_closer() {
        // "spent" follows "earned" and sits right next to the amount
        let result = classify("earned nothing this week, spent $50 on fuel");
        assert_eq!(result.resolution, Resolution::TieBreak);
        assert_eq!(result.record_type, RecordType::Loss);
    }

    #[test]
    fn test_tie_break_profit_when_closer() {
        let result = classify("made $200 after I paid for the stall");
        assert_eq!(result.resolution, Resolution::TieBreak);
        assert_eq!(result.record_type, RecordType::Profit);
    }

    #[test]
    fn test_tie_break_loss_before_profit_loses() {
        // loss indicator is closer but comes first
        let result = classify("paid $20 and later earned back some");
        assert_eq!(result.record_type, RecordType::Profit);
    }

    #[test]
    fn test_no_indicator_defaults_to_profit() {
        let result = classify("$45 from the garage sale");
        assert_eq!(result.record_type, RecordType::Profit);
        assert_eq!(result.resolution, Resolution::Defaulted);
        assert!(result.indicators.is_empty());
    }

    #[test]
    fn test_whole_words_only() {
        assert!(find_indicators("handmade costume").is_empty());
        assert_eq!(find_indicators("Paid twice").len(), 1);
    }
}
