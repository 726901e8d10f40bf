use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// Direction of money movement. Authoritative for a transaction's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    /// Negative amounts are debits; everything else is a credit.
    pub fn from_sign(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Debit
        } else {
            Self::Credit
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "credit"),
            Self::Debit => write!(f, "debit"),
        }
    }
}

/// Which ledger a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSide {
    Transaction,
    Statement,
}

impl std::fmt::Display for RecordSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction"),
            Self::Statement => write!(f, "statement"),
        }
    }
}

/// An internal system transaction. `amount` is always a positive magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        amount: Decimal,
        direction: Direction,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self> {
        let tx = Self {
            id: id.into(),
            amount,
            direction,
            occurred_at,
        };
        tx.validate()?;
        Ok(tx)
    }

    /// Build from a signed amount: negative becomes a debit, positive a credit.
    pub fn from_signed(
        id: impl Into<String>,
        signed_amount: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self> {
        Self::new(
            id,
            signed_amount.abs(),
            Direction::from_sign(signed_amount),
            occurred_at,
        )
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ReconError::invalid_record(
                RecordSide::Transaction,
                &self.id,
                "id must be non-empty",
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ReconError::invalid_record(
                RecordSide::Transaction,
                &self.id,
                format!("amount must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}

/// A bank-statement line. `amount` is signed: negative is a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStatementEntry {
    pub id: String,
    pub amount: Decimal,
    pub posted_on: NaiveDate,
}

impl BankStatementEntry {
    pub fn new(id: impl Into<String>, amount: Decimal, posted_on: NaiveDate) -> Result<Self> {
        let entry = Self {
            id: id.into(),
            amount,
            posted_on,
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    /// The direction this entry's sign stands for.
    pub fn implied_direction(&self) -> Direction {
        Direction::from_sign(self.amount)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ReconError::invalid_record(
                RecordSide::Statement,
                &self.id,
                "id must be non-empty",
            ));
        }
        if self.amount.is_zero() {
            return Err(ReconError::invalid_record(
                RecordSide::Statement,
                &self.id,
                "amount must be non-zero",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scoring output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Close,
    Fuzzy,
    Possible,
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Close => write!(f, "close"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Possible => write!(f, "possible"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Per-criterion sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub amount: f64,
    pub date: f64,
    #[serde(rename = "type")]
    pub kind: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub transaction: Transaction,
    pub statement: BankStatementEntry,
    pub match_type: MatchType,
    pub confidence: f64,
    /// `transaction.amount - |statement.amount|`.
    pub amount_delta: Decimal,
    /// Normalized transaction date minus posted date, in calendar days.
    pub date_delta_days: i64,
    pub scores: ScoreBreakdown,
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// A record skipped during a pass because it violated the model invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordAnomaly {
    pub side: RecordSide,
    pub record_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub total_transactions: usize,
    pub matched_transactions: usize,
    pub unmatched_transactions: usize,
    pub total_statements: usize,
    pub matched_statements: usize,
    pub unmatched_statements: usize,
    pub match_type_counts: BTreeMap<MatchType, usize>,
    pub matched_amount: Decimal,
    pub unmatched_transaction_amount: Decimal,
    pub unmatched_statement_amount: Decimal,
    pub average_confidence: f64,
}

impl ReconSummary {
    /// `matched + unmatched == total` on both sides and type counts sum to matches.
    pub fn is_consistent(&self) -> bool {
        let type_total: usize = self.match_type_counts.values().sum();
        self.matched_transactions + self.unmatched_transactions == self.total_transactions
            && self.matched_statements + self.unmatched_statements == self.total_statements
            && type_total == self.matched_transactions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub matches: Vec<MatchResult>,
    pub unmatched_transactions: Vec<Transaction>,
    pub unmatched_statements: Vec<BankStatementEntry>,
    pub anomalies: Vec<RecordAnomaly>,
    pub summary: ReconSummary,
}
