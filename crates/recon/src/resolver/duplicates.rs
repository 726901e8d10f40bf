use serde::Serialize;

use crate::index::TransactionIndex;
use crate::model::Transaction;

/// Widest gap between two records that can still be duplicates of each other.
pub const DUPLICATE_WINDOW_SECS: u64 = 3_600;

const AMOUNT_WEIGHT: f64 = 0.4;
const DIRECTION_WEIGHT: f64 = 0.3;

/// Transactions that likely describe the same event. The first member, in
/// load order, is the reference the others are measured against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub transactions: Vec<Transaction>,
    pub confidence: f64,
}

fn seconds_apart(a: &Transaction, b: &Transaction) -> u64 {
    (a.occurred_at - b.occurred_at).num_seconds().unsigned_abs()
}

/// Same amount, same direction, at most an hour apart.
pub fn is_potential_duplicate(a: &Transaction, b: &Transaction) -> bool {
    a.amount == b.amount
        && a.direction == b.direction
        && seconds_apart(a, b) <= DUPLICATE_WINDOW_SECS
}

fn proximity_bonus(seconds: u64) -> f64 {
    match seconds {
        0..=300 => 0.3,
        301..=1_800 => 0.2,
        1_801..=DUPLICATE_WINDOW_SECS => 0.1,
        _ => 0.0,
    }
}

/// Mean pairwise evidence of each member against the reference.
///
/// Amount and direction always agree inside a group because the linking
/// predicate requires them, so time proximity is what moves the score.
fn group_confidence(members: &[&Transaction]) -> f64 {
    let Some((reference, rest)) = members.split_first() else {
        return 0.0;
    };
    if rest.is_empty() {
        return 0.0;
    }
    let total: f64 = rest
        .iter()
        .map(|m| {
            let mut score = 0.0;
            if m.amount == reference.amount {
                score += AMOUNT_WEIGHT;
            }
            if m.direction == reference.direction {
                score += DIRECTION_WEIGHT;
            }
            score + proximity_bonus(seconds_apart(m, reference))
        })
        .sum();
    total / rest.len() as f64
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Single-linkage clusters of potential duplicates, ordered by their first
/// member's load position. Only records sharing an exact amount are compared.
pub fn detect_duplicates(index: &TransactionIndex) -> Vec<DuplicateGroup> {
    let records = index.records();
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for positions in index.amount_groups() {
        let valid: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| records[p].validate().is_ok())
            .collect();
        if valid.len() < 2 {
            continue;
        }

        let mut parent: Vec<usize> = (0..valid.len()).collect();
        for i in 0..valid.len() {
            for j in (i + 1)..valid.len() {
                if is_potential_duplicate(&records[valid[i]], &records[valid[j]]) {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[rj.max(ri)] = ri.min(rj);
                    }
                }
            }
        }

        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); valid.len()];
        for (i, &position) in valid.iter().enumerate() {
            let root = find(&mut parent, i);
            by_root[root].push(position);
        }
        clusters.extend(by_root.into_iter().filter(|c| c.len() >= 2));
    }

    for cluster in &mut clusters {
        cluster.sort_unstable();
    }
    clusters.sort_by_key(|c| c[0]);

    clusters
        .into_iter()
        .map(|cluster| {
            let members: Vec<&Transaction> = cluster.iter().map(|&p| &records[p]).collect();
            DuplicateGroup {
                confidence: group_confidence(&members),
                transactions: members.into_iter().cloned().collect(),
            }
        })
        .collect()
}
