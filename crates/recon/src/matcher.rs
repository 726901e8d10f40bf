use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::classify::classify_match;
use crate::config::{business_days_between, statement_time, MatchingConfig};
use crate::model::{BankStatementEntry, MatchResult, ScoreBreakdown, Transaction};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Score one transaction/statement pair. Pure: depends only on its inputs.
pub fn score_match(
    tx: &Transaction,
    entry: &BankStatementEntry,
    config: &MatchingConfig,
) -> MatchResult {
    let mut reasons = Vec::with_capacity(3);

    let amount_delta = tx.amount - entry.magnitude();
    let tolerance = config.amount_tolerance(tx.amount);
    let amount = amount_score(amount_delta.abs(), tolerance);
    reasons.push(amount_reason(amount_delta, tolerance, amount));

    let occurred = config.normalize_time(tx.occurred_at);
    let posted = statement_time(entry.posted_on);
    let date_delta_days = (occurred.date() - entry.posted_on).num_days();
    let date = date_score(occurred, posted, config);
    reasons.push(date_reason(date_delta_days, date, config));

    let implied = entry.implied_direction();
    let kind = if !config.enable_type_matching || tx.direction == implied {
        1.0
    } else {
        0.0
    };
    reasons.push(if !config.enable_type_matching {
        "type matching disabled".to_string()
    } else if kind == 1.0 {
        format!("type matches ({})", tx.direction)
    } else {
        format!("type mismatch ({} vs {implied})", tx.direction)
    });

    let scores = ScoreBreakdown { amount, date, kind };
    let confidence = (amount * config.weights.amount
        + date * config.weights.date
        + kind * config.weights.kind)
        .clamp(0.0, 1.0);

    MatchResult {
        transaction: tx.clone(),
        statement: entry.clone(),
        match_type: classify_match(confidence, &scores, config),
        confidence,
        amount_delta,
        date_delta_days,
        scores,
        reasons,
    }
}

/// 1.0 on exact magnitude, linear decay to 0.0 at the tolerance edge.
pub fn amount_score(difference: Decimal, tolerance: Decimal) -> f64 {
    if difference.is_zero() {
        return 1.0;
    }
    if tolerance.is_zero() || difference > tolerance {
        return 0.0;
    }
    linear_decay(difference, tolerance)
}

/// `max(0, 1 - part/whole)` computed in decimal, then narrowed.
pub(crate) fn linear_decay(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    let ratio = part.abs().checked_div(whole).and_then(|r| r.to_f64()).unwrap_or(1.0);
    (1.0 - ratio).max(0.0)
}

fn date_score(
    occurred: chrono::NaiveDateTime,
    posted: chrono::NaiveDateTime,
    config: &MatchingConfig,
) -> f64 {
    if config.date_tolerance_days == 0 {
        return if occurred.date() == posted.date() { 1.0 } else { 0.0 };
    }
    if !config.is_within_date_tolerance(occurred, posted) {
        return 0.0;
    }

    let allowed = config.date_tolerance_days as f64;
    let elapsed = if config.ignore_weekends {
        business_days_between(occurred.date(), posted.date()) as f64
    } else {
        let span = if occurred >= posted { occurred - posted } else { posted - occurred };
        span.num_seconds() as f64 / SECONDS_PER_DAY
    };
    (1.0 - elapsed / allowed).clamp(0.0, 1.0)
}

fn amount_reason(delta: Decimal, tolerance: Decimal, score: f64) -> String {
    if delta.is_zero() {
        "exact amount match".to_string()
    } else if score > 0.0 {
        format!("amount within tolerance (diff {delta}, tolerance {tolerance})")
    } else if delta.abs() <= tolerance {
        format!("amount at tolerance edge (diff {delta})")
    } else {
        format!("amount mismatch (diff {delta})")
    }
}

fn date_reason(delta_days: i64, score: f64, config: &MatchingConfig) -> String {
    if delta_days == 0 && score > 0.0 {
        "same date".to_string()
    } else if score > 0.0 {
        format!(
            "date within tolerance ({} day(s) apart, tolerance {})",
            delta_days.abs(),
            config.date_tolerance_days
        )
    } else {
        format!("date outside tolerance ({} day(s) apart)", delta_days.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimezoneMode;
    use crate::model::{Direction, MatchType};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn tx(cents: i64, direction: Direction, y: i32, m: u32, d: u32) -> Transaction {
        Transaction::new(
            "t1",
            Decimal::new(cents, 2),
            direction,
            Utc.with_ymd_and_hms(y, m, d, 14, 30, 0).unwrap(),
        )
        .unwrap()
    }

    fn stmt(cents: i64, y: i32, m: u32, d: u32) -> BankStatementEntry {
        BankStatementEntry::new("s1", Decimal::new(cents, 2), NaiveDate::from_ymd_opt(y, m, d).unwrap())
            .unwrap()
    }

    #[test]
    fn exact_credit_scenario() {
        let result = score_match(
            &tx(10050, Direction::Credit, 2024, 1, 15),
            &stmt(10050, 2024, 1, 15),
            &MatchingConfig::default(),
        );
        assert_eq!(result.match_type, MatchType::Exact);
        assert!(result.confidence >= 0.95);
        assert_eq!(result.amount_delta, Decimal::ZERO);
        assert_eq!(result.date_delta_days, 0);
        assert_eq!(result.reasons[0], "exact amount match");
        assert_eq!(result.reasons[1], "same date");
    }

    #[test]
    fn debit_sign_convention() {
        let result = score_match(
            &tx(25000, Direction::Debit, 2024, 3, 4),
            &stmt(-25000, 2024, 3, 4),
            &MatchingConfig::default(),
        );
        assert_eq!(result.scores.kind, 1.0);
        assert_eq!(result.scores.amount, 1.0);
        assert_eq!(result.match_type, MatchType::Exact);
    }

    #[test]
    fn type_mismatch_scores_zero() {
        let result = score_match(
            &tx(25000, Direction::Credit, 2024, 3, 4),
            &stmt(-25000, 2024, 3, 4),
            &MatchingConfig::default(),
        );
        assert_eq!(result.scores.kind, 0.0);
        assert!((result.confidence - 0.8).abs() < 1e-9);
        assert!(result.reasons[2].starts_with("type mismatch"));

        let relaxed = MatchingConfig { enable_type_matching: false, ..MatchingConfig::default() };
        let result = score_match(
            &tx(25000, Direction::Credit, 2024, 3, 4),
            &stmt(-25000, 2024, 3, 4),
            &relaxed,
        );
        assert_eq!(result.scores.kind, 1.0);
    }

    #[test]
    fn tolerance_boundary() {
        let config = MatchingConfig {
            amount_tolerance_percent: Decimal::ONE,
            ..MatchingConfig::default()
        };
        let target = tx(10000, Direction::Credit, 2024, 1, 15);

        // Exactly at the edge: still a candidate, but the decay reaches zero.
        let edge = score_match(&target, &stmt(10100, 2024, 1, 15), &config);
        assert_eq!(edge.scores.amount, 0.0);
        assert_eq!(edge.amount_delta, Decimal::new(-100, 2));
        assert!(edge.reasons[0].contains("tolerance edge"));

        let inside = score_match(&target, &stmt(10050, 2024, 1, 15), &config);
        assert!((inside.scores.amount - 0.5).abs() < 1e-9);

        let outside = score_match(&target, &stmt(10101, 2024, 1, 15), &config);
        assert_eq!(outside.scores.amount, 0.0);
        assert!(outside.reasons[0].contains("mismatch"));
    }

    #[test]
    fn zero_tolerance_requires_exact_amount() {
        assert_eq!(amount_score(Decimal::new(1, 2), Decimal::ZERO), 0.0);
        assert_eq!(amount_score(Decimal::ZERO, Decimal::ZERO), 1.0);
    }

    #[test]
    fn date_decay_with_tolerance() {
        let config = MatchingConfig { date_tolerance_days: 2, ..MatchingConfig::default() };
        let one_day = score_match(
            &tx(10000, Direction::Credit, 2024, 1, 15),
            &stmt(10000, 2024, 1, 16),
            &config,
        );
        assert!((one_day.scores.date - 0.5).abs() < 1e-9);
        assert_eq!(one_day.date_delta_days, -1);

        let three_days = score_match(
            &tx(10000, Direction::Credit, 2024, 1, 15),
            &stmt(10000, 2024, 1, 18),
            &config,
        );
        assert_eq!(three_days.scores.date, 0.0);
        assert!(three_days.reasons[1].starts_with("date outside"));
    }

    #[test]
    fn date_decay_uses_wall_clock_outside_date_only() {
        let config = MatchingConfig {
            date_tolerance_days: 1,
            timezone: TimezoneMode::Utc,
            ..MatchingConfig::default()
        };
        // 14:30 vs midnight is 14.5 hours of a 24 hour allowance
        let result = score_match(
            &tx(10000, Direction::Credit, 2024, 1, 15),
            &stmt(10000, 2024, 1, 15),
            &config,
        );
        let expected = 1.0 - 14.5 / 24.0;
        assert!((result.scores.date - expected).abs() < 1e-9);
    }

    #[test]
    fn business_day_decay() {
        let config = MatchingConfig {
            date_tolerance_days: 2,
            ignore_weekends: true,
            ..MatchingConfig::default()
        };
        // Friday to Monday is one business day
        let result = score_match(
            &tx(10000, Direction::Credit, 2024, 1, 12),
            &stmt(10000, 2024, 1, 15),
            &config,
        );
        assert!((result.scores.date - 0.5).abs() < 1e-9);
    }

    #[test]
    fn scoring_is_pure() {
        let config = MatchingConfig::relaxed();
        let a = tx(10000, Direction::Credit, 2024, 1, 15);
        let b = stmt(10040, 2024, 1, 16);
        assert_eq!(score_match(&a, &b, &config), score_match(&a, &b, &config));
    }
}
