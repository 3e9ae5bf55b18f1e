//! Statement → record extraction
//!
//! Pure function over (text, today): amount, then date, then type, then the
//! leftover text becomes `details`. Persistence is the caller's job.

use crate::classifier::TypeClassifier;
use crate::error::ExtractionFailure;
use crate::models::FinancialRecord;
use crate::parsing::{parse_amount, parse_date};
use chrono::NaiveDate;
use std::ops::Range;
use tracing::{debug, info};

/// Stripped from the front of details ("I", "a", a dangling "on", ...)
const LEADING_FILLER: &[&str] = &[
    "i", "we", "just", "a", "an", "the", "on", "of", "and", "have", "has", "had", "was",
    "were", "is",
];

/// Stripped from the end of details
const TRAILING_FILLER: &[&str] = &[
    "on", "of", "and", "for", "from", "at", "to", "with", "a", "an", "the", "is", "was",
];

const EDGE_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '-'];

/// Turns one free-form statement into a `FinancialRecord`
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn extract(text: &str, today: NaiveDate) -> Result<FinancialRecord, ExtractionFailure> {
        let Some(amount) = parse_amount(text) else {
            info!(text, "No amount found in statement");
            return Err(ExtractionFailure::no_amount(text));
        };

        let date = parse_date(text, today);
        let classification = TypeClassifier::classify(text, Some(&amount.span));

        let details = match &amount.basis {
            Some(basis) => format!(
                "Investment of {} with {}% {}",
                basis.base.normalize(),
                basis.percent.normalize(),
                classification.record_type
            ),
            None => {
                let mut removed = Vec::with_capacity(classification.indicators.len() + 2);
                removed.push(absorb_preceding(text, amount.span.clone(), &["of"]));
                if let Some(span) = date.span.clone() {
                    removed.push(absorb_preceding(text, span, &["on"]));
                }
                removed.extend(classification.indicators.iter().map(|h| h.span.clone()));
                clean_details(text, &removed)
            }
        };

        debug!(
            record_type = ?classification.record_type,
            amount = %amount.value,
            date = %date.date,
            date_source = ?date.source,
            "Extracted record"
        );

        Ok(FinancialRecord::from_parts(
            classification.record_type,
            amount.value,
            date.date,
            details,
        ))
    }
}

/// Convenience wrapper over [`RecordExtractor::extract`]
pub fn extract(text: &str, today: NaiveDate) -> Result<FinancialRecord, ExtractionFailure> {
    RecordExtractor::extract(text, today)
}

/// Extend `span` backwards over a directly preceding connector word
fn absorb_preceding(text: &str, span: Range<usize>, connectors: &[&str]) -> Range<usize> {
    let head = text[..span.start].trim_end();
    let word_start = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    let word = &head[word_start..];

    if connectors.iter().any(|c| word.eq_ignore_ascii_case(c)) {
        word_start..span.end
    } else {
        span
    }
}

/// Remove spans, collapse whitespace and trim filler at both ends
fn clean_details(text: &str, removed: &[Range<usize>]) -> String {
    let kept: String = text
        .char_indices()
        .map(|(i, c)| {
            if removed.iter().any(|r| r.contains(&i)) {
                ' '
            } else {
                c
            }
        })
        .collect();

    let mut words: Vec<&str> = kept.split_whitespace().collect();

    loop {
        let before = words.len();

        if let Some(first) = words.first().copied() {
            words[0] = first.trim_start_matches(EDGE_PUNCTUATION);
        }
        if let Some(last) = words.last().copied() {
            let end = words.len() - 1;
            words[end] = last.trim_end_matches(EDGE_PUNCTUATION);
        }
        words.retain(|w| !w.is_empty());

        if words
            .first()
            .map_or(false, |w| LEADING_FILLER.contains(&w.to_lowercase().as_str()))
        {
            words.remove(0);
        }
        if words
            .last()
            .map_or(false, |w| TRAILING_FILLER.contains(&w.to_lowercase().as_str()))
        {
            words.pop();
        }

        if words.len() == before {
            break;
        }
    }

    words.join(" ")
}
