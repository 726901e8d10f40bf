use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::{BankStatementEntry, MatchResult, ReconSummary, Transaction};

/// Compute summary statistics for one reconciliation pass.
///
/// Totals come from the loaded indices, not from the partition, so a broken
/// partition shows up in [`ReconSummary::is_consistent`] instead of being
/// silently absorbed.
pub fn compute_summary(
    total_transactions: usize,
    total_statements: usize,
    matches: &[MatchResult],
    unmatched_transactions: &[Transaction],
    unmatched_statements: &[BankStatementEntry],
) -> ReconSummary {
    let mut match_type_counts = BTreeMap::new();
    let mut matched_amount = Decimal::ZERO;
    let mut confidence_total = 0.0;

    for m in matches {
        *match_type_counts.entry(m.match_type).or_insert(0) += 1;
        matched_amount += m.transaction.amount;
        confidence_total += m.confidence;
    }

    let average_confidence = if matches.is_empty() {
        0.0
    } else {
        confidence_total / matches.len() as f64
    };

    ReconSummary {
        total_transactions,
        matched_transactions: matches.len(),
        unmatched_transactions: unmatched_transactions.len(),
        total_statements,
        matched_statements: matches.len(),
        unmatched_statements: unmatched_statements.len(),
        match_type_counts,
        matched_amount,
        unmatched_transaction_amount: unmatched_transactions.iter().map(|t| t.amount).sum(),
        unmatched_statement_amount: unmatched_statements.iter().map(|s| s.magnitude()).sum(),
        average_confidence,
    }
}
