//! Per-side lookup structures for candidate generation.
//!
//! The two index types mirror each other. Transactions carry a positive
//! magnitude plus a direction while statements carry a signed amount, and
//! each side resolves signs its own way.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{statement_time, MatchingConfig};
use crate::model::{BankStatementEntry, Direction, Transaction};

/// Records sharing one magnitude, in load order.
#[derive(Debug, Clone)]
struct AmountGroup {
    amount: Decimal,
    positions: Vec<usize>,
}

/// Insert `position` under `amount`, keeping groups sorted ascending.
fn insert_sorted(groups: &mut Vec<AmountGroup>, amount: Decimal, position: usize) {
    match groups.binary_search_by(|g| g.amount.cmp(&amount)) {
        Ok(i) => groups[i].positions.push(position),
        Err(i) => groups.insert(
            i,
            AmountGroup {
                amount,
                positions: vec![position],
            },
        ),
    }
}

/// Positions of every group with `min <= amount <= max`.
fn range_positions(groups: &[AmountGroup], min: Decimal, max: Decimal) -> Vec<usize> {
    let start = groups.partition_point(|g| g.amount < min);
    groups[start..]
        .iter()
        .take_while(|g| g.amount <= max)
        .flat_map(|g| g.positions.iter().copied())
        .collect()
}

fn dates_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TransactionIndex {
    records: Vec<Transaction>,
    by_amount: HashMap<Decimal, Vec<usize>>,
    /// Keyed by the UTC calendar date of `occurred_at`.
    by_date: HashMap<NaiveDate, Vec<usize>>,
    by_type: HashMap<Direction, Vec<usize>>,
    sorted: Vec<AmountGroup>,
}

impl TransactionIndex {
    pub fn build(records: Vec<Transaction>) -> Self {
        let mut index = Self::default();
        index.extend(records);
        index
    }

    /// Append records and amend every derived structure.
    pub fn extend(&mut self, records: impl IntoIterator<Item = Transaction>) {
        for tx in records {
            let position = self.records.len();
            let amount = tx.amount.normalize();
            self.by_amount.entry(amount).or_default().push(position);
            self.by_date
                .entry(tx.occurred_at.date_naive())
                .or_default()
                .push(position);
            self.by_type.entry(tx.direction).or_default().push(position);
            insert_sorted(&mut self.sorted, amount, position);
            self.records.push(tx);
        }
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&Transaction> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve(&self, positions: &[usize]) -> Vec<&Transaction> {
        positions.iter().filter_map(|&p| self.records.get(p)).collect()
    }

    pub fn exact_amount(&self, amount: Decimal) -> Vec<&Transaction> {
        self.by_amount
            .get(&amount.abs().normalize())
            .map(|p| self.resolve(p))
            .unwrap_or_default()
    }

    /// Inclusive magnitude range, ascending by amount then load order.
    pub fn amount_range(&self, min: Decimal, max: Decimal) -> Vec<&Transaction> {
        self.resolve(&range_positions(&self.sorted, min, max))
    }

    pub fn by_date(&self, date: NaiveDate) -> Vec<&Transaction> {
        self.by_date
            .get(&date)
            .map(|p| self.resolve(p))
            .unwrap_or_default()
    }

    /// Inclusive, one map lookup per day.
    pub fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Transaction> {
        dates_inclusive(start, end)
            .flat_map(|d| self.by_date(d))
            .collect()
    }

    pub fn by_type(&self, direction: Direction) -> Vec<&Transaction> {
        self.by_type
            .get(&direction)
            .map(|p| self.resolve(p))
            .unwrap_or_default()
    }

    /// Transactions eligible for scoring against `entry`.
    ///
    /// The cap keeps the first N in index order, not the best N.
    pub fn candidates(&self, entry: &BankStatementEntry, config: &MatchingConfig) -> Vec<&Transaction> {
        self.resolve(&self.candidate_positions(entry, config))
    }

    /// Positions sharing one magnitude, ascending by magnitude.
    pub(crate) fn amount_groups(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.sorted.iter().map(|g| g.positions.as_slice())
    }

    pub(crate) fn candidate_positions(
        &self,
        entry: &BankStatementEntry,
        config: &MatchingConfig,
    ) -> Vec<usize> {
        let magnitude = entry.magnitude();
        let tolerance = config.amount_tolerance(magnitude);
        let posted = statement_time(entry.posted_on);
        let implied = entry.implied_direction();

        range_positions(
            &self.sorted,
            magnitude.saturating_sub(tolerance),
            magnitude.saturating_add(tolerance),
        )
        .into_iter()
        .filter(|&p| {
            let tx = &self.records[p];
            tx.validate().is_ok()
                && (config.date_tolerance_days == 0
                    || config.is_within_date_tolerance(config.normalize_time(tx.occurred_at), posted))
                && (!config.enable_type_matching || tx.direction == implied)
        })
        .take(config.max_candidates_per_transaction)
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StatementIndex {
    records: Vec<BankStatementEntry>,
    /// Keyed by the signed amount.
    by_amount: HashMap<Decimal, Vec<usize>>,
    by_date: HashMap<NaiveDate, Vec<usize>>,
    /// Keyed by magnitude.
    sorted: Vec<AmountGroup>,
}

impl StatementIndex {
    pub fn build(records: Vec<BankStatementEntry>) -> Self {
        let mut index = Self::default();
        index.extend(records);
        index
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = BankStatementEntry>) {
        for entry in records {
            let position = self.records.len();
            self.by_amount
                .entry(entry.amount.normalize())
                .or_default()
                .push(position);
            self.by_date.entry(entry.posted_on).or_default().push(position);
            insert_sorted(&mut self.sorted, entry.magnitude().normalize(), position);
            self.records.push(entry);
        }
    }

    pub fn records(&self) -> &[BankStatementEntry] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&BankStatementEntry> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve(&self, positions: &[usize]) -> Vec<&BankStatementEntry> {
        positions.iter().filter_map(|&p| self.records.get(p)).collect()
    }

    /// Entries with exactly this signed amount.
    pub fn exact_amount(&self, amount: Decimal) -> Vec<&BankStatementEntry> {
        self.by_amount
            .get(&amount.normalize())
            .map(|p| self.resolve(p))
            .unwrap_or_default()
    }

    /// Inclusive magnitude range, ascending by magnitude then load order.
    pub fn amount_range(&self, min: Decimal, max: Decimal) -> Vec<&BankStatementEntry> {
        self.resolve(&range_positions(&self.sorted, min, max))
    }

    pub fn by_date(&self, date: NaiveDate) -> Vec<&BankStatementEntry> {
        self.by_date
            .get(&date)
            .map(|p| self.resolve(p))
            .unwrap_or_default()
    }

    pub fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&BankStatementEntry> {
        dates_inclusive(start, end)
            .flat_map(|d| self.by_date(d))
            .collect()
    }

    /// Statement entries eligible for scoring against `tx`.
    ///
    /// Invalid entries never count toward the cap. The cap keeps the first N
    /// valid entries in index order, not the best N.
    pub fn candidates(&self, tx: &Transaction, config: &MatchingConfig) -> Vec<&BankStatementEntry> {
        self.resolve(&self.candidate_positions(tx, config))
    }

    /// Entries whose magnitude fits inside `tx.amount` (plus tolerance),
    /// used as building blocks for split matches.
    pub fn partial_candidates(&self, tx: &Transaction, config: &MatchingConfig) -> Vec<&BankStatementEntry> {
        let tolerance = config.amount_tolerance(tx.amount);
        let pool = range_positions(&self.sorted, Decimal::ZERO, tx.amount.saturating_add(tolerance));
        self.resolve(&self.filter_positions(pool, tx, config))
    }

    pub(crate) fn candidate_positions(&self, tx: &Transaction, config: &MatchingConfig) -> Vec<usize> {
        let tolerance = config.amount_tolerance(tx.amount);
        let pool = range_positions(
            &self.sorted,
            tx.amount.saturating_sub(tolerance),
            tx.amount.saturating_add(tolerance),
        );
        self.filter_positions(pool, tx, config)
    }

    fn filter_positions(&self, pool: Vec<usize>, tx: &Transaction, config: &MatchingConfig) -> Vec<usize> {
        let occurred = config.normalize_time(tx.occurred_at);
        pool.into_iter()
            .filter(|&p| {
                let entry = &self.records[p];
                entry.validate().is_ok()
                    && (config.date_tolerance_days == 0
                        || config.is_within_date_tolerance(occurred, statement_time(entry.posted_on)))
                    && (!config.enable_type_matching || entry.implied_direction() == tx.direction)
            })
            .take(config.max_candidates_per_transaction)
            .collect()
    }
}
