//! Batch reconciliation over one loaded pair of ledgers.
//!
//! Assignment is greedy and order-dependent: transactions are visited in load
//! order and each takes its best-scoring statement if nobody claimed it first.
//! A transaction whose best statement is already taken stays unmatched even if
//! a weaker candidate is still free. This is not a maximum-weight bipartite
//! matching, and switching to one would change observable results.

use log::{debug, info, warn};

use crate::config::MatchingConfig;
use crate::error::{ReconError, Result};
use crate::evidence::compute_summary;
use crate::index::{StatementIndex, TransactionIndex};
use crate::matcher::score_match;
use crate::model::{
    BankStatementEntry, MatchResult, RecordAnomaly, RecordSide, ReconciliationResult, Transaction,
};

/// Load lifecycle of a [`MatchingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Empty,
    TransactionsLoaded,
    StatementsLoaded,
    Ready,
    Reconciled,
}

#[derive(Debug, Clone)]
pub struct MatchingEngine {
    config: MatchingConfig,
    transactions: Option<TransactionIndex>,
    statements: Option<StatementIndex>,
    state: EngineState,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transactions: None,
            statements: None,
            state: EngineState::Empty,
        })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Replace the configuration. Loaded data is kept; a reconciled engine
    /// drops back to `Ready` because its last result no longer applies.
    pub fn set_config(&mut self, config: MatchingConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.refresh_state();
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn transaction_index(&self) -> Option<&TransactionIndex> {
        self.transactions.as_ref()
    }

    pub fn statement_index(&self) -> Option<&StatementIndex> {
        self.statements.as_ref()
    }

    /// Replace the transaction side and rebuild its index.
    pub fn load_transactions(&mut self, records: Vec<Transaction>) {
        info!("loading {} transactions", records.len());
        self.transactions = Some(TransactionIndex::build(records));
        self.refresh_state();
    }

    /// Replace the statement side and rebuild its index.
    pub fn load_statements(&mut self, records: Vec<BankStatementEntry>) {
        info!("loading {} statement entries", records.len());
        self.statements = Some(StatementIndex::build(records));
        self.refresh_state();
    }

    /// Append transactions, amending the existing index in place.
    pub fn add_transactions(&mut self, records: Vec<Transaction>) {
        debug!("adding {} transactions", records.len());
        self.transactions
            .get_or_insert_with(TransactionIndex::default)
            .extend(records);
        self.refresh_state();
    }

    pub fn add_statements(&mut self, records: Vec<BankStatementEntry>) {
        debug!("adding {} statement entries", records.len());
        self.statements
            .get_or_insert_with(StatementIndex::default)
            .extend(records);
        self.refresh_state();
    }

    fn refresh_state(&mut self) {
        self.state = match (self.transactions.is_some(), self.statements.is_some()) {
            (false, false) => EngineState::Empty,
            (true, false) => EngineState::TransactionsLoaded,
            (false, true) => EngineState::StatementsLoaded,
            (true, true) => EngineState::Ready,
        };
    }

    fn loaded_transactions(&self) -> Result<&TransactionIndex> {
        let index = self
            .transactions
            .as_ref()
            .ok_or(ReconError::NotLoaded { missing: "transactions" })?;
        if index.is_empty() {
            return Err(ReconError::EmptyInput { side: RecordSide::Transaction });
        }
        Ok(index)
    }

    fn loaded_statements(&self) -> Result<&StatementIndex> {
        let index = self
            .statements
            .as_ref()
            .ok_or(ReconError::NotLoaded { missing: "statements" })?;
        if index.is_empty() {
            return Err(ReconError::EmptyInput { side: RecordSide::Statement });
        }
        Ok(index)
    }

    // -----------------------------------------------------------------------
    // Reconcile
    // -----------------------------------------------------------------------

    /// Run one greedy assignment pass over the loaded batch.
    pub fn reconcile(&mut self) -> Result<ReconciliationResult> {
        let result = self.run_pass()?;
        self.state = EngineState::Reconciled;
        Ok(result)
    }

    fn run_pass(&self) -> Result<ReconciliationResult> {
        if self.transactions.is_none() && self.statements.is_none() {
            return Err(ReconError::NotLoaded { missing: "transactions and statements" });
        }
        let transactions = self.loaded_transactions()?;
        let statements = self.loaded_statements()?;
        let config = &self.config;

        info!(
            "reconciling {} transactions against {} statement entries",
            transactions.len(),
            statements.len()
        );

        let mut anomalies = Vec::new();
        let tx_valid = validity(
            transactions.records(),
            RecordSide::Transaction,
            &mut anomalies,
            Transaction::validate,
        );
        let stmt_valid = validity(
            statements.records(),
            RecordSide::Statement,
            &mut anomalies,
            BankStatementEntry::validate,
        );

        let mut tx_used = vec![false; transactions.len()];
        let mut stmt_used = vec![false; statements.len()];
        let mut matches = Vec::new();

        for (ti, tx) in transactions.records().iter().enumerate() {
            if tx_used[ti] || !tx_valid[ti] {
                continue;
            }

            let positions: Vec<usize> = statements
                .candidate_positions(tx, config)
                .into_iter()
                .filter(|&si| stmt_valid[si])
                .collect();
            if positions.is_empty() {
                debug!("transaction '{}': no candidates", tx.id);
                continue;
            }

            let ranked = rank(
                positions
                    .into_iter()
                    .map(|si| (si, score_match(tx, &statements.records()[si], config))),
                config,
            );

            let Some((si, best)) = ranked.into_iter().next() else {
                debug!("transaction '{}': no candidate above threshold", tx.id);
                continue;
            };

            if stmt_used[si] {
                debug!(
                    "transaction '{}': best statement '{}' already claimed, left unmatched",
                    tx.id, best.statement.id
                );
                continue;
            }

            debug!(
                "transaction '{}' -> statement '{}' ({}, {:.3})",
                tx.id, best.statement.id, best.match_type, best.confidence
            );
            tx_used[ti] = true;
            stmt_used[si] = true;
            matches.push(best);
        }

        let unmatched_transactions: Vec<Transaction> = transactions
            .records()
            .iter()
            .enumerate()
            .filter(|(i, _)| !tx_used[*i])
            .map(|(_, t)| t.clone())
            .collect();
        let unmatched_statements: Vec<BankStatementEntry> = statements
            .records()
            .iter()
            .enumerate()
            .filter(|(i, _)| !stmt_used[*i])
            .map(|(_, s)| s.clone())
            .collect();

        let summary = compute_summary(
            transactions.len(),
            statements.len(),
            &matches,
            &unmatched_transactions,
            &unmatched_statements,
        );

        info!(
            "reconciled: {} matched, {} unmatched transactions, {} unmatched statements, {} anomalies",
            summary.matched_transactions,
            summary.unmatched_transactions,
            summary.unmatched_statements,
            anomalies.len()
        );

        Ok(ReconciliationResult {
            matches,
            unmatched_transactions,
            unmatched_statements,
            anomalies,
            summary,
        })
    }

    // -----------------------------------------------------------------------
    // Single-record lookups
    // -----------------------------------------------------------------------

    /// Scored, thresholded, best-first statement candidates for `tx`.
    /// No assignment is performed.
    pub fn find_matches(&self, tx: &Transaction) -> Result<Vec<MatchResult>> {
        let statements = self.loaded_statements()?;
        let scored = statements
            .candidate_positions(tx, &self.config)
            .into_iter()
            .filter_map(|si| statements.get(si))
            .filter(|entry| entry.validate().is_ok())
            .map(|entry| (0, score_match(tx, entry, &self.config)));
        Ok(rank(scored, &self.config).into_iter().map(|(_, m)| m).collect())
    }

    /// Scored, thresholded, best-first transaction candidates for `entry`.
    pub fn find_matches_for_statement(&self, entry: &BankStatementEntry) -> Result<Vec<MatchResult>> {
        let transactions = self.loaded_transactions()?;
        let scored = transactions
            .candidate_positions(entry, &self.config)
            .into_iter()
            .filter_map(|ti| transactions.get(ti))
            .filter(|tx| tx.validate().is_ok())
            .map(|tx| (0, score_match(tx, entry, &self.config)));
        Ok(rank(scored, &self.config).into_iter().map(|(_, m)| m).collect())
    }
}

/// Drop candidates under the threshold and sort best-first. The sort is
/// stable, so ties keep index order.
fn rank(
    scored: impl Iterator<Item = (usize, MatchResult)>,
    config: &MatchingConfig,
) -> Vec<(usize, MatchResult)> {
    let mut kept: Vec<(usize, MatchResult)> = scored
        .filter(|(_, m)| m.confidence >= config.min_confidence_score)
        .collect();
    kept.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
    kept
}

/// Per-position validity flags. Invalid records are logged and reported once.
fn validity<T>(
    records: &[T],
    side: RecordSide,
    anomalies: &mut Vec<RecordAnomaly>,
    check: impl Fn(&T) -> Result<()>,
) -> Vec<bool> {
    records
        .iter()
        .map(|record| match check(record) {
            Ok(()) => true,
            Err(err) => {
                warn!("skipping {side}: {err}");
                let (record_id, reason) = match err {
                    ReconError::InvalidRecord { record_id, reason, .. } => (record_id, reason),
                    other => (String::new(), other.to_string()),
                };
                anomalies.push(RecordAnomaly { side, record_id, reason });
                false
            }
        })
        .collect()
}
