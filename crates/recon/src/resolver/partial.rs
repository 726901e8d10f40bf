use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::matcher::amount_score;
use crate::model::{BankStatementEntry, Transaction};

/// Largest number of statement entries combined into one split match.
pub const MAX_PARTIAL_GROUP_SIZE: usize = 4;

/// Smallest combination worth reporting. A single entry is an ordinary match.
const MIN_PARTIAL_GROUP_SIZE: usize = 2;

/// One transaction settled by several statement entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialMatch {
    pub transaction: Transaction,
    pub statements: Vec<BankStatementEntry>,
    /// Sum of the entries' magnitudes.
    pub total: Decimal,
    /// `total / transaction.amount`.
    pub ratio: f64,
    pub confidence: f64,
}

/// Discount for matches that need many entries.
pub fn complexity_penalty(members: usize) -> f64 {
    (1.0 - 0.1 * members.saturating_sub(1) as f64).max(0.1)
}

/// Score every 2..=4 combination of `candidates` against `tx`, best first.
///
/// Ties keep enumeration order: smaller groups first, then lexicographic by
/// candidate position. An invalid `tx` yields nothing.
pub fn partial_matches_for(
    tx: &Transaction,
    candidates: &[&BankStatementEntry],
    config: &MatchingConfig,
) -> Vec<PartialMatch> {
    if tx.validate().is_err() {
        return Vec::new();
    }
    let target = tx.amount;
    let tolerance = config.amount_tolerance(target);
    let min_ratio = 1.0 - config.max_partial_match_ratio;
    let largest = MAX_PARTIAL_GROUP_SIZE.min(candidates.len());

    let mut found = Vec::new();
    for size in MIN_PARTIAL_GROUP_SIZE..=largest {
        for combo in combinations(candidates.len(), size) {
            let Some(total) = combo
                .iter()
                .try_fold(Decimal::ZERO, |acc, &i| acc.checked_add(candidates[i].magnitude()))
            else {
                continue;
            };
            let difference = (total - target).abs();
            if difference > tolerance {
                continue;
            }
            let Some(ratio) = total.checked_div(target) else {
                continue;
            };
            let ratio = ratio.to_f64().unwrap_or(0.0);
            if ratio < min_ratio {
                continue;
            }
            found.push(PartialMatch {
                transaction: tx.clone(),
                statements: combo.iter().map(|&i| candidates[i].clone()).collect(),
                total,
                ratio,
                confidence: amount_score(difference, tolerance) * complexity_penalty(size),
            });
        }
    }

    found.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    found
}

/// All k-element index subsets of `0..n`, lexicographic.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut combo = Vec::with_capacity(k);

    fn gen(start: usize, n: usize, k: usize, combo: &mut Vec<usize>, result: &mut Vec<Vec<usize>>) {
        if combo.len() == k {
            result.push(combo.clone());
            return;
        }
        // Not enough items left to fill the combination
        if n - start < k - combo.len() {
            return;
        }
        for i in start..n {
            combo.push(i);
            gen(i + 1, n, k, combo, result);
            combo.pop();
        }
    }

    gen(0, n, k, &mut combo, &mut result);
    result
}
