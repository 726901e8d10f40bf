use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::RecordSide;

/// Which kind of failure a [`ReconError`] represents.
///
/// Callers use this to decide whether to fix input, fix config, or proceed
/// with partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Data missing or unusable before any scoring begins. Recoverable by reloading.
    Precondition,
    /// Out-of-range tolerances, weights, thresholds or zone names.
    Configuration,
    /// A single malformed record. The rest of the batch is unaffected.
    Record,
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Reconcile (or a lookup) was invoked before the required side was loaded.
    #[error("data not loaded: {missing}")]
    NotLoaded { missing: &'static str },

    /// A side was loaded but contains no records.
    #[error("no {side} records to reconcile")]
    EmptyInput { side: RecordSide },

    /// Currency resolution needs a strictly positive rate.
    #[error("exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),

    /// Converted amount does not fit in a `Decimal`.
    #[error("converting {amount} at rate {rate} overflows")]
    ConversionOverflow { amount: Decimal, rate: Decimal },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// A config value is outside its allowed range.
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Business timezone name does not resolve to an IANA zone.
    #[error("unknown business timezone '{0}'")]
    UnknownTimezone(String),

    /// A record violates the model invariants.
    #[error("{side} '{record_id}': {reason}")]
    InvalidRecord {
        side: RecordSide,
        record_id: String,
        reason: String,
    },
}

impl ReconError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotLoaded { .. }
            | Self::EmptyInput { .. }
            | Self::InvalidExchangeRate(_)
            | Self::ConversionOverflow { .. } => ErrorCategory::Precondition,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::UnknownTimezone(_) => {
                ErrorCategory::Configuration
            }
            Self::InvalidRecord { .. } => ErrorCategory::Record,
        }
    }

    pub(crate) fn invalid_record(
        side: RecordSide,
        record_id: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            side,
            record_id: record_id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
