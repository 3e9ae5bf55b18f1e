//! Date expression parser
//!
//! The current date is always injected by the caller so results are
//! deterministic. Rules are tried in priority order:
//! 1. numeric dates (`MM/DD/YYYY`, `MM-DD-YY`, `YYYY-MM-DD`), parsed literally
//! 2. month name + day (`March 15th`, `15 March`, `Mar 3, 2023`)
//! 3. relative keywords (`today`, `yesterday`)
//! 4. nothing found: the current date

use crate::parsing::{month_from_name, MONTH_ALTERNATION};
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

lazy_static! {
    static ref ISO_DATE: Regex =
        Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid iso regex");
    static ref US_DATE: Regex =
        Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4}|\d{2})\b").expect("valid us regex");
    static ref MONTH_DAY: Regex = Regex::new(&format!(
        r"(?i)\b({})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?",
        MONTH_ALTERNATION
    ))
    .expect("valid month-day regex");
    static ref DAY_MONTH: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})\b\.?(?:,?\s+(\d{{4}})\b)?",
        MONTH_ALTERNATION
    ))
    .expect("valid day-month regex");
    static ref RELATIVE: Regex =
        Regex::new(r"(?i)\b(today|yesterday)\b").expect("valid relative regex");
    /// A year on its own: "in 2023", "March 2024"
    static ref YEAR_REFERENCE: Regex = Regex::new(&format!(
        r"(?i)\b(?:in|of|since|during|{})\.?\s+((?:19|20)\d{{2}})\b",
        MONTH_ALTERNATION
    ))
    .expect("valid year regex");
}

/// Which rule produced a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Explicit,
    MonthDay,
    Relative,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub date: NaiveDate,
    /// `None` when the date was defaulted
    pub span: Option<Range<usize>>,
    pub source: DateSource,
}

/// Resolve the date a statement refers to. Never fails.
pub fn parse_date(text: &str, today: NaiveDate) -> DateMatch {
    if let Some((date, span)) = parse_explicit_date(text) {
        return DateMatch { date, span: Some(span), source: DateSource::Explicit };
    }

    if let Some((date, span)) = parse_month_day(text, today) {
        return DateMatch { date, span: Some(span), source: DateSource::MonthDay };
    }

    if let Some(m) = RELATIVE.find(text) {
        let date = match m.as_str().to_lowercase().as_str() {
            "yesterday" => today.pred_opt().unwrap_or(today),
            _ => today,
        };
        return DateMatch { date, span: Some(m.range()), source: DateSource::Relative };
    }

    debug!(%today, "No date expression found, using current date");
    DateMatch { date: today, span: None, source: DateSource::Defaulted }
}

/// Numeric dates only. Invalid calendar values are skipped, not errors.
pub fn parse_explicit_date(text: &str) -> Option<(NaiveDate, Range<usize>)> {
    let iso = ISO_DATE.captures_iter(text).map(|c| (c, DateOrder::YearFirst));
    let us = US_DATE.captures_iter(text).map(|c| (c, DateOrder::MonthFirst));

    let mut candidates: Vec<(Captures<'_>, DateOrder)> = iso.chain(us).collect();
    candidates.sort_by_key(|(caps, _)| caps.get(0).map_or(usize::MAX, |m| m.start()));

    candidates.into_iter().find_map(|(caps, order)| {
        let whole = caps.get(0)?;
        let a: u32 = caps.get(1)?.as_str().parse().ok()?;
        let b: u32 = caps.get(2)?.as_str().parse().ok()?;
        let c = caps.get(3)?.as_str();

        let date = match order {
            DateOrder::YearFirst => NaiveDate::from_ymd_opt(a as i32, b, c.parse().ok()?),
            DateOrder::MonthFirst => NaiveDate::from_ymd_opt(expand_year(c)?, a, b),
        };

        if date.is_none() {
            debug!(candidate = whole.as_str(), "Rejected invalid calendar date");
        }
        date.map(|d| (d, whole.range()))
    })
}

/// Byte spans of everything in `text` that reads as a date or a year,
/// whether or not it is a valid calendar date.
pub(crate) fn date_fragment_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = [&*ISO_DATE, &*US_DATE, &*MONTH_DAY, &*DAY_MONTH]
        .into_iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| m.range()))
        .collect();

    spans.extend(
        YEAR_REFERENCE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|year| year.range()),
    );
    spans
}

#[derive(Debug, Clone, Copy)]
enum DateOrder {
    YearFirst,
    MonthFirst,
}

/// Two-digit years pivot at 50: `24` is 2024, `87` is 1987
fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(match (raw.len(), year) {
        (2, y) if y < 50 => 2000 + y,
        (2, y) => 1900 + y,
        (_, y) => y,
    })
}

fn parse_month_day(text: &str, today: NaiveDate) -> Option<(NaiveDate, Range<usize>)> {
    let month_first = MONTH_DAY
        .captures_iter(text)
        .map(|c| (c, 1usize, 2usize));
    let day_first = DAY_MONTH
        .captures_iter(text)
        .map(|c| (c, 2usize, 1usize));

    let mut candidates: Vec<_> = month_first.chain(day_first).collect();
    candidates.sort_by_key(|(caps, _, _)| caps.get(0).map_or(usize::MAX, |m| m.start()));

    candidates.into_iter().find_map(|(caps, month_idx, day_idx)| {
        let whole = caps.get(0)?;
        let month = month_from_name(caps.get(month_idx)?.as_str())?;
        let day: u32 = caps.get(day_idx)?.as_str().parse().ok()?;

        let date = match caps.get(3) {
            Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day)?,
            None => {
                // Statements describe the past: a date later than today means last year
                let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
                match this_year {
                    Some(d) if d <= today => d,
                    _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day)?,
                }
            }
        };

        Some((date, whole.range()))
    })
}
