use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::error::{ReconError, Result};
use crate::matcher::amount_score;
use crate::model::{BankStatementEntry, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyResolution {
    pub transaction_id: String,
    pub statement_id: String,
    pub exchange_rate: Decimal,
    /// Transaction amount in the statement's currency, rounded to precision.
    pub converted_amount: Decimal,
    /// `converted_amount - |statement.amount|`.
    pub difference: Decimal,
    pub tolerance: Decimal,
    pub is_match: bool,
    pub confidence: f64,
}

/// Compare a transaction against a statement entry booked in another currency.
///
/// `rate` converts one unit of the transaction currency into the statement
/// currency. Sourcing the rate is the caller's job.
pub fn resolve_currency(
    tx: &Transaction,
    entry: &BankStatementEntry,
    rate: Decimal,
    config: &MatchingConfig,
) -> Result<CurrencyResolution> {
    if rate <= Decimal::ZERO {
        return Err(ReconError::InvalidExchangeRate(rate));
    }

    let converted_amount = tx
        .amount
        .checked_mul(rate)
        .ok_or(ReconError::ConversionOverflow { amount: tx.amount, rate })?
        .round_dp_with_strategy(config.amount_precision, RoundingStrategy::MidpointAwayFromZero);
    let difference = converted_amount - entry.magnitude();
    let tolerance = config.amount_tolerance(converted_amount);

    Ok(CurrencyResolution {
        transaction_id: tx.id.clone(),
        statement_id: entry.id.clone(),
        exchange_rate: rate,
        converted_amount,
        difference,
        tolerance,
        is_match: difference.abs() <= tolerance,
        confidence: amount_score(difference.abs(), tolerance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::model::Direction;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn usd(cents: i64) -> Transaction {
        Transaction::new(
            "t1",
            Decimal::new(cents, 2),
            Direction::Debit,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn eur(cents: i64) -> BankStatementEntry {
        BankStatementEntry::new("s1", Decimal::new(cents, 2), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .unwrap()
    }

    #[test]
    fn exact_conversion() {
        let r = resolve_currency(&usd(10000), &eur(-8500), Decimal::new(85, 2), &MatchingConfig::default())
            .unwrap();
        assert!(r.is_match);
        assert_eq!(r.converted_amount, Decimal::new(8500, 2));
        assert_eq!(r.difference, Decimal::ZERO);
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn conversion_within_tolerance_decays() {
        let config = MatchingConfig { amount_tolerance_percent: Decimal::ONE, ..MatchingConfig::default() };
        let r = resolve_currency(&usd(10000), &eur(-8550), Decimal::new(85, 2), &config).unwrap();
        assert!(r.is_match);
        assert_eq!(r.tolerance, Decimal::new(85, 2));
        assert!((r.confidence - (1.0 - 0.5 / 0.85)).abs() < 1e-9);

        let r = resolve_currency(&usd(10000), &eur(-8600), Decimal::new(85, 2), &config).unwrap();
        assert!(!r.is_match);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn converted_amount_is_rounded() {
        // 33.33 * 1.2345 = 41.146...
        let r = resolve_currency(&usd(3333), &eur(4115), Decimal::new(12345, 4), &MatchingConfig::default())
            .unwrap();
        assert_eq!(r.converted_amount, Decimal::new(4115, 2));
        assert!(r.is_match);
    }

    #[test]
    fn rate_must_be_positive() {
        let err = resolve_currency(&usd(100), &eur(100), Decimal::ZERO, &MatchingConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReconError::InvalidExchangeRate(_)));
        assert_eq!(err.category(), ErrorCategory::Precondition);
        assert!(resolve_currency(&usd(100), &eur(100), Decimal::NEGATIVE_ONE, &MatchingConfig::default())
            .is_err());
    }

    #[test]
    fn overflowing_conversion_is_an_error() {
        let huge = Decimal::new(1_000_000_000_000_000, 0);
        let tx = Transaction::new(
            "t1",
            huge,
            Direction::Debit,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        )
        .unwrap();
        let err = resolve_currency(&tx, &eur(100), huge, &MatchingConfig::default()).unwrap_err();
        assert!(matches!(err, ReconError::ConversionOverflow { .. }));
        assert_eq!(err.category(), ErrorCategory::Precondition);
    }
}
