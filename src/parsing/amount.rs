//! Monetary amount parser
//!
//! Rules, highest confidence first:
//! 1. percentage of a stated investment ("invested 1,000 ... profit is 10%")
//! 2. currency-symbol prefix (`$500`, `$1,500.00`, `₹200`)
//! 3. currency-word suffix (`500 dollars`, `200 rupees`)
//! 4. bare numeral close to a profit/loss trigger word (`lost 200`)

use crate::classifier::find_indicators;
use crate::parsing::date::date_fragment_spans;
use crate::parsing::span_distance;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;

/// Max byte gap between a bare numeral and a trigger word
const NEAR_TRIGGER_BYTES: usize = 24;

const NUMERAL: &str = r"(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?";

lazy_static! {
    static ref SYMBOL_PREFIXED: Regex =
        Regex::new(&format!(r"[$€£₹]\s?{}", NUMERAL)).expect("valid symbol regex");
    static ref SUFFIX_LABELLED: Regex = Regex::new(&format!(
        r"(?i)\b{}\s*(?:dollars?|usd|bucks?|rupees?|euros?|rs)\b",
        NUMERAL
    ))
    .expect("valid suffix regex");
    static ref BARE: Regex = Regex::new(&format!(r"\b{}\b", NUMERAL)).expect("valid numeral regex");
    static ref NUMBER: Regex = Regex::new(NUMERAL).expect("valid number regex");
    static ref PERCENT_AFTER_TRIGGER: Regex = Regex::new(
        r"(?i)\b(?:profit|loss|gain|return)s?\s+(?:is|of|at|was)\s+(\d+(?:\.\d+)?)\s*(?:%|percent\b)"
    )
    .expect("valid percent regex");
    static ref PERCENT_BEFORE_TRIGGER: Regex =
        Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:%|percent)\s+(?:profit|loss|gain|return)")
            .expect("valid percent regex");
    static ref INVESTMENT_BASE: Regex = Regex::new(&format!(
        r"(?i)\b(?:invested|investment\s+(?:of|is|was)|capital\s+(?:of|is|was)|base\s+(?:of|is))\s+[$€£₹]?{}",
        NUMERAL
    ))
    .expect("valid investment regex");
}

/// Investment and rate an amount was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentBasis {
    pub base: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountMatch {
    pub value: Decimal,
    /// Byte span of the matched text
    pub span: Range<usize>,
    pub basis: Option<PercentBasis>,
}

/// Locate the first high-confidence monetary amount in `text`.
pub fn parse_amount(text: &str) -> Option<AmountMatch> {
    percentage_amount(text)
        .or_else(|| first_match(&SYMBOL_PREFIXED, text))
        .or_else(|| first_match(&SUFFIX_LABELLED, text))
        .or_else(|| bare_amount_near_trigger(text))
}

/// Strip thousands separators and parse as an exact decimal
fn parse_numeral(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}

fn first_match(pattern: &Regex, text: &str) -> Option<AmountMatch> {
    pattern
        .find_iter(text)
        .filter(|m| !is_cut_short(text, m.end()) && !continues_numeral(text, m.start()))
        .find_map(|m| {
            let numeral = NUMBER.find(m.as_str())?;
            Some(AmountMatch {
                value: parse_numeral(numeral.as_str())?,
                span: m.range(),
                basis: None,
            })
        })
}

fn percentage_amount(text: &str) -> Option<AmountMatch> {
    let caps = PERCENT_AFTER_TRIGGER
        .captures(text)
        .or_else(|| PERCENT_BEFORE_TRIGGER.captures(text))?;
    let percent_span = caps.get(0)?.range();
    let percent = parse_numeral(caps.get(1)?.as_str())?;

    let base_caps = INVESTMENT_BASE.captures(text)?;
    let base_text = base_caps.get(0)?.as_str();
    let base = parse_numeral(NUMBER.find(base_text)?.as_str())?;

    Some(AmountMatch {
        value: base * percent / Decimal::ONE_HUNDRED,
        span: percent_span,
        basis: Some(PercentBasis { base, percent }),
    })
}

fn bare_amount_near_trigger(text: &str) -> Option<AmountMatch> {
    let indicators = find_indicators(text);
    if indicators.is_empty() {
        return None;
    }

    let dates = date_fragment_spans(text);

    BARE.find_iter(text)
        .filter(|m| !is_date_or_rate_fragment(text, m.range()))
        .filter(|m| !dates.iter().any(|d| d.start < m.end() && m.start() < d.end))
        .filter(|m| !is_cut_short(text, m.end()) && !continues_numeral(text, m.start()))
        .find(|m| {
            indicators
                .iter()
                .any(|hit| span_distance(&hit.span, &m.range()) <= NEAR_TRIGGER_BYTES)
        })
        .and_then(|m| {
            Some(AmountMatch {
                value: parse_numeral(m.as_str())?,
                span: m.range(),
                basis: None,
            })
        })
}

/// The numeral continues past `end` (`$1,5000` stops matching at `1,500`)
fn is_cut_short(text: &str, end: usize) -> bool {
    let mut rest = text[end..].chars();
    match rest.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(',') => rest.next().map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

/// The numeral starting at `start` is the tail of a longer one (`5000` in `1,5000`)
fn continues_numeral(text: &str, start: usize) -> bool {
    let mut head = text[..start].chars().rev();
    head.next() == Some(',') && head.next().map_or(false, |c| c.is_ascii_digit())
}

/// True when the numeral belongs to a date (`12/15/2024`, `2024-12-15`),
/// a time (`5:30`) or a percentage (`10%`).
fn is_date_or_rate_fragment(text: &str, span: Range<usize>) -> bool {
    let before = text[..span.start].chars().next_back();
    let mut after = text[span.end..].chars();
    let next = after.next();
    let next_is_digit_follow = after.next().map_or(false, |c| c.is_ascii_digit());

    let joined_before = matches!(before, Some('/') | Some('-') | Some(':') | Some('.'));
    let joined_after = match next {
        Some('/') | Some('-') | Some(':') => next_is_digit_follow,
        Some('%') => true,
        _ => false,
    };

    joined_before || joined_after
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn value(text: &str) -> Option<Decimal> {
        parse_amount(text).map(|m| m.value)
    }

    #[test]
    fn test_symbol_prefixed() {
        assert_eq!(value("Earned $1,500.00 from consulting"), Some(dec!(1500.00)));
        assert_eq!(value("spent $75 on lunch"), Some(dec!(75)));
        assert_eq!(value("got ₹ 2,000 back"), Some(dec!(2000)));
        assert_eq!(value("paid $12.5 tip"), Some(dec!(12.5)));
    }

    #[test]
    fn test_suffix_labelled() {
        assert_eq!(value("I received 500 dollars today"), Some(dec!(500.00)));
        assert_eq!(value("lost 1,200 rupees at the market"), Some(dec!(1200)));
        assert_eq!(value("that cost 30 USD"), Some(dec!(30)));
    }

    #[test]
    fn test_symbol_wins_over_suffix() {
        let m = parse_amount("paid 20 dollars after earning $300").unwrap();
        assert_eq!(m.value, dec!(300));
    }

    #[test]
    fn test_bare_numeral_near_trigger() {
        assert_eq!(value("Lost 200 yesterday on groceries"), Some(dec!(200)));
        assert_eq!(value("made 45.50 selling lemonade"), Some(dec!(45.50)));
    }

    #[test]
    fn test_bare_numeral_without_trigger_is_ignored() {
        assert_eq!(value("meeting room 42 booked"), None);
        assert_eq!(value("just a note, no numbers"), None);
    }

    #[test]
    fn test_date_fragments_are_not_amounts() {
        assert_eq!(value("spent on 12/15/2024"), None);
        assert_eq!(value("profit on 2024-03-01"), None);
        assert_eq!(value("lost on March 15th"), None);

        let m = parse_amount("Spent 75 on 12/15/2024").unwrap();
        assert_eq!(m.value, dec!(75));
        assert_eq!(m.span, 6..8);
    }

    #[test]
    fn test_month_name_day_is_not_an_amount() {
        assert_eq!(value("lost on March 15"), None);
        assert_eq!(value("received payment on 15 March"), None);
        assert_eq!(value("spent it on Mar 3, 2021"), None);

        let m = parse_amount("earned 40 on March 15").unwrap();
        assert_eq!(m.value, dec!(40));
    }

    #[test]
    fn test_year_is_not_an_amount() {
        assert_eq!(value("made a profit in 2023"), None);
        assert_eq!(value("lost money in March 2024"), None);
        assert_eq!(value("made 2023 selling lemonade"), Some(dec!(2023)));
    }

    #[test]
    fn test_unicode_whitespace_does_not_panic() {
        assert_eq!(value("paid\u{a0}rent $50"), Some(dec!(50)));
        assert_eq!(value("lost\u{3000}200\u{3000}today"), Some(dec!(200)));
    }

    #[test]
    fn test_misgrouped_numeral_is_not_shortened() {
        assert_eq!(value("lost $1,5000 today"), None);
        assert_eq!(value("spent $1,500 today"), Some(dec!(1500)));
        assert_eq!(value("earned $300, then left"), Some(dec!(300)));
        assert_eq!(value("lost 1,2000 dollars"), None);
    }

    #[test]
    fn test_percentage_of_investment() {
        let m = parse_amount("I invested 1,000 and the profit is 10%").unwrap();
        assert_eq!(m.value, dec!(100));
        assert_eq!(
            m.basis,
            Some(PercentBasis {
                base: dec!(1000),
                percent: dec!(10)
            })
        );

        assert_eq!(value("investment of $2500 gave a 4.5% return"), Some(dec!(112.5)));
        assert_eq!(value("invested 2000, 15% profit"), Some(dec!(300)));
    }

    #[test]
    fn test_percentage_without_base_falls_through() {
        // no stated investment, so the percentage is not an amount
        assert_eq!(value("profit is 10% on $400"), Some(dec!(400)));
    }

    #[test]
    fn test_span_covers_symbol() {
        let text = "I earned $1500 today";
        let m = parse_amount(text).unwrap();
        assert_eq!(&text[m.span], "$1500");
    }
}
