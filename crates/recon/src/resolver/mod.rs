//! Secondary analyses for cases the greedy pass leaves open.
//!
//! Every capability reads the engine's loaded records and config and is
//! independent of the others. None of them changes a reconciliation result.

mod currency;
mod duplicates;
mod partial;
mod same_day;
mod timezone;

pub use currency::{resolve_currency, CurrencyResolution};
pub use duplicates::{detect_duplicates, is_potential_duplicate, DuplicateGroup, DUPLICATE_WINDOW_SECS};
pub use partial::{complexity_penalty, partial_matches_for, PartialMatch, MAX_PARTIAL_GROUP_SIZE};
pub use same_day::{analyze_same_day, choose_strategy, ResolutionStrategy, SameDayAnalysis};
pub use timezone::{date_proximity_score, resolve_timezone, TimezoneResolution, ZoneTrial};

use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::engine::MatchingEngine;
use crate::error::{ReconError, Result};
use crate::index::{StatementIndex, TransactionIndex};
use crate::model::{BankStatementEntry, ReconciliationResult, Transaction};

/// Everything the resolver can say about one reconciliation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeCaseReport {
    pub duplicates: Vec<DuplicateGroup>,
    pub same_day: Vec<SameDayAnalysis>,
    /// Best split match per unmatched transaction, built from unmatched
    /// statement entries only.
    pub partial_matches: Vec<PartialMatch>,
}

pub struct EdgeCaseResolver<'a> {
    engine: &'a MatchingEngine,
}

impl<'a> EdgeCaseResolver<'a> {
    pub fn new(engine: &'a MatchingEngine) -> Self {
        Self { engine }
    }

    fn config(&self) -> &MatchingConfig {
        self.engine.config()
    }

    fn transactions(&self) -> Result<&'a TransactionIndex> {
        self.engine
            .transaction_index()
            .ok_or(ReconError::NotLoaded { missing: "transactions" })
    }

    fn statements(&self) -> Result<&'a StatementIndex> {
        self.engine
            .statement_index()
            .ok_or(ReconError::NotLoaded { missing: "statements" })
    }

    pub fn detect_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        let groups = detect_duplicates(self.transactions()?);
        debug!("found {} potential duplicate groups", groups.len());
        Ok(groups)
    }

    pub fn analyze_same_day(&self) -> Result<Vec<SameDayAnalysis>> {
        let analyses = analyze_same_day(self.transactions()?, self.statements()?, self.config());
        debug!("found {} dates with same-day ambiguity", analyses.len());
        Ok(analyses)
    }

    /// Split matches for `tx` drawn from the whole statement side. Empty when
    /// partial matching is disabled, an error when `tx` itself is invalid.
    pub fn find_partial_matches(&self, tx: &Transaction) -> Result<Vec<PartialMatch>> {
        let statements = self.statements()?;
        if !self.config().enable_partial_matching {
            debug!("partial matching disabled, skipping '{}'", tx.id);
            return Ok(Vec::new());
        }
        tx.validate()?;
        let candidates = statements.partial_candidates(tx, self.config());
        Ok(self.partial_matches_for(tx, &candidates))
    }

    /// Split matches for `tx` over a caller-chosen candidate set. Empty for an
    /// invalid `tx`.
    pub fn partial_matches_for(&self, tx: &Transaction, candidates: &[&BankStatementEntry]) -> Vec<PartialMatch> {
        if !self.config().enable_partial_matching {
            return Vec::new();
        }
        partial_matches_for(tx, candidates, self.config())
    }

    pub fn resolve_timezone(&self, tx: &Transaction, entry: &BankStatementEntry) -> TimezoneResolution {
        resolve_timezone(tx, entry)
    }

    pub fn resolve_currency(
        &self,
        tx: &Transaction,
        entry: &BankStatementEntry,
        rate: Decimal,
    ) -> Result<CurrencyResolution> {
        resolve_currency(tx, entry, rate, self.config())
    }

    /// Run duplicate, same-day and partial analysis against `result`.
    pub fn analyze(&self, result: &ReconciliationResult) -> Result<EdgeCaseReport> {
        let duplicates = self.detect_duplicates()?;
        let same_day = self.analyze_same_day()?;

        let mut partial_matches = Vec::new();
        if self.config().enable_partial_matching {
            let statements = self.statements()?;
            for tx in &result.unmatched_transactions {
                let open: Vec<&BankStatementEntry> = statements
                    .partial_candidates(tx, self.config())
                    .into_iter()
                    .filter(|s| result.unmatched_statements.contains(*s))
                    .collect();
                if let Some(best) = partial_matches_for(tx, &open, self.config()).into_iter().next() {
                    debug!(
                        "transaction '{}' splits across {} statement entries ({:.3})",
                        tx.id,
                        best.statements.len(),
                        best.confidence
                    );
                    partial_matches.push(best);
                }
            }
        }

        Ok(EdgeCaseReport {
            duplicates,
            same_day,
            partial_matches,
        })
    }
}
