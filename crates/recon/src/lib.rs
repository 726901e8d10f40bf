//! `ledgermatch-recon`: ledger-to-bank-statement matching engine.
//!
//! Pure engine crate: receives validated transactions and statement entries,
//! returns scored one-to-one matches plus edge-case analysis.
//! No CLI or IO dependencies; logging goes through the `log` facade.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod index;
pub mod matcher;
pub mod model;
pub mod resolver;

pub use config::{MatchWeights, MatchingConfig, TimezoneMode};
pub use engine::{EngineState, MatchingEngine};
pub use error::{ErrorCategory, ReconError, Result};
pub use index::{StatementIndex, TransactionIndex};
pub use matcher::score_match;
pub use model::{
    BankStatementEntry, Direction, MatchResult, MatchType, ReconSummary, ReconciliationResult,
    RecordAnomaly, RecordSide, ScoreBreakdown, Transaction,
};
pub use resolver::{EdgeCaseReport, EdgeCaseResolver};
