//! Filtering and aggregation over the stored records
//!
//! All arithmetic is exact `Decimal`. Aggregates are always recomputed from
//! the matched set so they can never drift from the listing.

use crate::models::{
    Aggregates, FinancialRecord, MonthlyTotals, QueryIntent, RecordType, ReportResult,
};
use chrono::Datelike;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

pub struct ReportEngine;

impl ReportEngine {
    pub fn run(intent: &QueryIntent, records: &[FinancialRecord]) -> ReportResult {
        let matched: Vec<FinancialRecord> = records
            .iter()
            .filter(|r| intent.scope.matches(r.date()) && intent.type_filter.matches(r.record_type()))
            .cloned()
            .collect();

        let aggregates = aggregate(&matched);
        let monthly = if intent.monthly_breakdown {
            monthly_breakdown(&matched)
        } else {
            Vec::new()
        };

        debug!(
            total = records.len(),
            matched = matched.len(),
            net = %aggregates.net,
            "Report computed"
        );

        ReportResult {
            scope: intent.scope,
            type_filter: intent.type_filter,
            matched,
            aggregates,
            monthly,
        }
    }
}

pub fn aggregate(records: &[FinancialRecord]) -> Aggregates {
    let mut totals = Aggregates::default();

    for record in records {
        match record.record_type() {
            RecordType::Profit => {
                totals.total_profit += record.amount();
                totals.profit_count += 1;
            }
            RecordType::Loss => {
                totals.total_loss += record.amount();
                totals.loss_count += 1;
            }
        }
    }

    totals.net = totals.total_profit - totals.total_loss;
    totals
}

/// Per calendar month, oldest first
fn monthly_breakdown(records: &[FinancialRecord]) -> Vec<MonthlyTotals> {
    let mut months: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();

    for record in records {
        let entry = months
            .entry((record.date().year(), record.date().month()))
            .or_default();
        match record.record_type() {
            RecordType::Profit => entry.0 += record.amount(),
            RecordType::Loss => entry.1 += record.amount(),
        }
    }

    months
        .into_iter()
        .map(|((year, month), (profit, loss))| MonthlyTotals {
            year,
            month,
            profit,
            loss,
        })
        .collect()
}
