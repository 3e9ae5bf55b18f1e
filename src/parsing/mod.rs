//! Span parsers for statements and questions
//!
//! Each parser locates one kind of value inside free text and reports the
//! byte span it matched, so callers can strip it from the remainder.

pub mod amount;
pub mod date;

pub use amount::{parse_amount, AmountMatch, PercentBasis};
pub use date::{parse_date, parse_explicit_date, DateMatch, DateSource};

use std::ops::Range;

const MONTHS: [(&str, &str); 12] = [
    ("january", "jan"),
    ("february", "feb"),
    ("march", "mar"),
    ("april", "apr"),
    ("may", "may"),
    ("june", "jun"),
    ("july", "jul"),
    ("august", "aug"),
    ("september", "sep"),
    ("october", "oct"),
    ("november", "nov"),
    ("december", "dec"),
];

/// Regex alternation matching every month name and abbreviation
pub(crate) const MONTH_ALTERNATION: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

/// Month number (1-12) for a full or abbreviated month name
pub fn month_from_name(word: &str) -> Option<u32> {
    let word = word.trim_end_matches('.').to_lowercase();
    let word = if word == "sept" { "sep".to_string() } else { word };

    MONTHS
        .iter()
        .position(|(full, short)| *full == word || *short == word)
        .map(|i| i as u32 + 1)
}

/// Capitalized month name, e.g. `March`
pub fn month_display(month: u32) -> &'static str {
    const DISPLAY: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ];
    month
        .checked_sub(1)
        .and_then(|i| DISPLAY.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// Gap in bytes between two spans (0 when they touch or overlap)
pub(crate) fn span_distance(a: &Range<usize>, b: &Range<usize>) -> usize {
    if a.end <= b.start {
        b.start - a.end
    } else if b.end <= a.start {
        a.start - b.end
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_from_name() {
        assert_eq!(month_from_name("March"), Some(3));
        assert_eq!(month_from_name("dec"), Some(12));
        assert_eq!(month_from_name("Sept."), Some(9));
        assert_eq!(month_from_name("smarch"), None);
    }

    #[test]
    fn test_span_distance() {
        assert_eq!(span_distance(&(0..5), &(8..10)), 3);
        assert_eq!(span_distance(&(8..10), &(0..5)), 3);
        assert_eq!(span_distance(&(0..5), &(3..10)), 0);
    }
}
