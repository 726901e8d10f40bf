use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::index::{StatementIndex, TransactionIndex};
use crate::matcher::score_match;
use crate::model::{BankStatementEntry, MatchResult, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    NoMatchesFound,
    /// Equal counts and every record on both sides has a potential match.
    OneToOneMapping,
    /// Fewer transactions than statement entries.
    ConsolidationNeeded,
    /// More transactions than statement entries.
    SplittingNeeded,
    ManualReviewRequired,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NoMatchesFound => "no_matches_found",
            Self::OneToOneMapping => "one_to_one_mapping",
            Self::ConsolidationNeeded => "consolidation_needed",
            Self::SplittingNeeded => "splitting_needed",
            Self::ManualReviewRequired => "manual_review_required",
        };
        f.write_str(label)
    }
}

/// One calendar date carrying more than one record on either side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SameDayAnalysis {
    pub date: NaiveDate,
    pub transactions: Vec<Transaction>,
    pub statements: Vec<BankStatementEntry>,
    /// Every same-date pair at or above the confidence threshold, best first.
    pub potential_matches: Vec<MatchResult>,
    /// `(max_pairs - potential) / max_pairs`, 0 when no pairs are possible.
    pub ambiguity_score: f64,
    pub strategy: ResolutionStrategy,
}

/// `covered_*` count the distinct records that appear in at least one
/// potential match, not the pairs.
pub fn choose_strategy(
    transactions: usize,
    statements: usize,
    covered_transactions: usize,
    covered_statements: usize,
) -> ResolutionStrategy {
    if covered_transactions == 0 && covered_statements == 0 {
        ResolutionStrategy::NoMatchesFound
    } else if transactions == statements
        && covered_transactions == transactions
        && covered_statements == statements
    {
        ResolutionStrategy::OneToOneMapping
    } else if transactions < statements {
        ResolutionStrategy::ConsolidationNeeded
    } else if transactions > statements {
        ResolutionStrategy::SplittingNeeded
    } else {
        ResolutionStrategy::ManualReviewRequired
    }
}

fn ambiguity_score(transactions: usize, statements: usize, potential: usize) -> f64 {
    let max_pairs = transactions * statements;
    if max_pairs == 0 {
        return 0.0;
    }
    max_pairs.saturating_sub(potential) as f64 / max_pairs as f64
}

#[derive(Default)]
struct DayBucket<'a> {
    transactions: Vec<&'a Transaction>,
    statements: Vec<&'a BankStatementEntry>,
}

/// Group both sides by normalized date and describe every crowded day.
pub fn analyze_same_day(
    transactions: &TransactionIndex,
    statements: &StatementIndex,
    config: &MatchingConfig,
) -> Vec<SameDayAnalysis> {
    let mut days: BTreeMap<NaiveDate, DayBucket<'_>> = BTreeMap::new();
    for tx in transactions.records().iter().filter(|t| t.validate().is_ok()) {
        let date = config.normalize_time(tx.occurred_at).date();
        days.entry(date).or_default().transactions.push(tx);
    }
    for entry in statements.records().iter().filter(|s| s.validate().is_ok()) {
        days.entry(entry.posted_on).or_default().statements.push(entry);
    }

    days.into_iter()
        .filter(|(_, day)| day.transactions.len() > 1 || day.statements.len() > 1)
        .map(|(date, day)| {
            let (tx_count, stmt_count) = (day.transactions.len(), day.statements.len());
            let mut tx_covered = vec![false; tx_count];
            let mut stmt_covered = vec![false; stmt_count];
            let mut potential_matches = Vec::new();
            for (ti, tx) in day.transactions.iter().enumerate() {
                for (si, entry) in day.statements.iter().enumerate() {
                    let m = score_match(tx, entry, config);
                    if m.confidence >= config.min_confidence_score {
                        tx_covered[ti] = true;
                        stmt_covered[si] = true;
                        potential_matches.push(m);
                    }
                }
            }
            potential_matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

            let potential = potential_matches.len();
            let covered_tx = tx_covered.iter().filter(|c| **c).count();
            let covered_stmt = stmt_covered.iter().filter(|c| **c).count();
            SameDayAnalysis {
                date,
                transactions: day.transactions.into_iter().cloned().collect(),
                statements: day.statements.into_iter().cloned().collect(),
                ambiguity_score: ambiguity_score(tx_count, stmt_count, potential),
                strategy: choose_strategy(tx_count, stmt_count, covered_tx, covered_stmt),
                potential_matches,
            }
        })
        .collect()
}
