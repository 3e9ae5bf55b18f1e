//! Core data models for the voice ledger

use crate::error::LedgerError;
use crate::parsing::month_display;
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Profit,
    Loss,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Profit => "profit",
            RecordType::Loss => "loss",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profit" => Ok(RecordType::Profit),
            "loss" => Ok(RecordType::Loss),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown record type '{}'",
                other
            ))),
        }
    }
}

//
// ================= Financial Record =================
//

/// One profit/loss transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct FinancialRecord {
    #[serde(rename = "type")]
    record_type: RecordType,
    #[serde(serialize_with = "serialize_money")]
    amount: Decimal,
    date: NaiveDate,
    details: String,
}

#[derive(Deserialize)]
struct RecordFields {
    #[serde(rename = "type")]
    record_type: RecordType,
    amount: Decimal,
    date: NaiveDate,
    #[serde(default)]
    details: String,
}

impl TryFrom<RecordFields> for FinancialRecord {
    type Error = LedgerError;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        FinancialRecord::new(fields.record_type, fields.amount, fields.date, fields.details)
    }
}

impl FinancialRecord {
    pub fn new(
        record_type: RecordType,
        amount: Decimal,
        date: NaiveDate,
        details: impl Into<String>,
    ) -> crate::Result<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::InvalidRecord(format!(
                "amount must be non-negative, got {}",
                amount
            )));
        }

        Ok(Self {
            record_type,
            amount,
            date,
            details: details.into(),
        })
    }

    /// Parsers only ever yield non-negative amounts
    pub(crate) fn from_parts(
        record_type: RecordType,
        amount: Decimal,
        date: NaiveDate,
        details: String,
    ) -> Self {
        Self {
            record_type,
            amount: amount.abs(),
            date,
            details,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// Full-precision amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    /// Fields as written to the flat store; also the duplicate-detection key.
    pub fn storage_fields(&self) -> [String; 4] {
        [
            self.record_type.to_string(),
            format_amount(self.amount),
            self.date.format("%Y-%m-%d").to_string(),
            self.details.clone(),
        ]
    }
}

//
// ================= Query Intent =================
//

/// Time window of a question
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Date { date: NaiveDate },
    /// A month without a year matches that month in every year
    Month { month: u32, year: Option<i32> },
    All,
}

impl Scope {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Scope::Date { date: wanted } => *wanted == date,
            Scope::Month { month, year } => {
                date.month() == *month && year.map_or(true, |y| date.year() == y)
            }
            Scope::All => true,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Date { date } => date.format("%Y-%m-%d").to_string(),
            Scope::Month { month, year: Some(year) } => {
                format!("{} {}", month_display(*month), year)
            }
            Scope::Month { month, year: None } => month_display(*month).to_string(),
            Scope::All => "All time".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    Profit,
    Loss,
    Both,
}

impl TypeFilter {
    pub fn matches(&self, record_type: RecordType) -> bool {
        match self {
            TypeFilter::Profit => record_type == RecordType::Profit,
            TypeFilter::Loss => record_type == RecordType::Loss,
            TypeFilter::Both => true,
        }
    }
}

/// Which parts of a report a question asks for
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Listing,
    Summary,
    FullReport,
}

impl Shape {
    pub fn includes_listing(&self) -> bool {
        matches!(self, Shape::Listing | Shape::FullReport)
    }

    pub fn includes_aggregates(&self) -> bool {
        matches!(self, Shape::Summary | Shape::FullReport)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct QueryIntent {
    pub scope: Scope,
    pub type_filter: TypeFilter,
    pub shape: Shape,
    pub monthly_breakdown: bool,
}

impl Default for QueryIntent {
    /// Widest possible question: all time, both types, full report
    fn default() -> Self {
        Self {
            scope: Scope::All,
            type_filter: TypeFilter::Both,
            shape: Shape::FullReport,
            monthly_breakdown: false,
        }
    }
}

//
// ================= Report =================
//

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Aggregates {
    #[serde(serialize_with = "serialize_money")]
    pub total_profit: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub total_loss: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub net: Decimal,
    pub profit_count: usize,
    pub loss_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyTotals {
    pub year: i32,
    pub month: u32,
    #[serde(serialize_with = "serialize_money")]
    pub profit: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub loss: Decimal,
}

impl MonthlyTotals {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportResult {
    pub scope: Scope,
    pub type_filter: TypeFilter,
    /// Store order, filtered
    pub matched: Vec<FinancialRecord>,
    /// Always computed from `matched`
    pub aggregates: Aggregates,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monthly: Vec<MonthlyTotals>,
}

impl ReportResult {
    pub fn of_type(&self, record_type: RecordType) -> impl Iterator<Item = &FinancialRecord> {
        self.matched
            .iter()
            .filter(move |r| r.record_type() == record_type)
    }
}

//
// ================= Money Formatting =================
//

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Plain two-decimal form, e.g. `1500.00`
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_money(value);
    rounded.rescale(2);
    rounded.to_string()
}

/// Two-decimal form with thousands separators, e.g. `2,500.00`
pub fn format_money(value: Decimal) -> String {
    let plain = format_amount(value);
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}

fn serialize_money<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_amount(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(format_amount(dec!(1500)), "1500.00");
        assert_eq!(format_amount(dec!(12.345)), "12.35");
        assert_eq!(format_money(dec!(2500)), "2,500.00");
        assert_eq!(format_money(dec!(1234567.8)), "1,234,567.80");
        assert_eq!(format_money(dec!(-1200)), "-1,200.00");
        assert_eq!(format_money(dec!(999.999)), "1,000.00");
        assert_eq!(format_money(dec!(0)), "0.00");
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = FinancialRecord::new(RecordType::Loss, dec!(-5), date(2024, 1, 1), "");
        assert!(result.is_err());
    }

    #[test]
    fn test_record_json_shape() {
        let record =
            FinancialRecord::new(RecordType::Profit, dec!(1500), date(2024, 12, 19), "from freelance work")
                .unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "profit");
        assert_eq!(json["amount"], "1500.00");
        assert_eq!(json["date"], "2024-12-19");
        assert_eq!(json["details"], "from freelance work");

        let back: FinancialRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_scope_matching() {
        let march_any = Scope::Month { month: 3, year: None };
        assert!(march_any.matches(date(2023, 3, 1)));
        assert!(march_any.matches(date(2024, 3, 31)));
        assert!(!march_any.matches(date(2024, 4, 1)));

        let march_2024 = Scope::Month { month: 3, year: Some(2024) };
        assert!(!march_2024.matches(date(2023, 3, 1)));
        assert_eq!(march_2024.label(), "March 2024");

        assert!(Scope::All.matches(date(1999, 12, 31)));
        assert!(Scope::Date { date: date(2024, 8, 12) }.matches(date(2024, 8, 12)));
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!(" Profit ".parse::<RecordType>().unwrap(), RecordType::Profit);
        assert_eq!("LOSS".parse::<RecordType>().unwrap(), RecordType::Loss);
        assert!("unknown".parse::<RecordType>().is_err());
    }
}
