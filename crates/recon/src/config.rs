use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Tolerances, weights and behavioral flags for one engine.
///
/// Missing TOML keys take the default preset's values. A config is validated
/// before an engine accepts it and is replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub date_tolerance_days: i64,
    /// Decimal places used when rounding derived tolerances.
    pub amount_precision: u32,
    pub amount_tolerance_percent: Decimal,
    pub min_confidence_score: f64,
    pub weights: MatchWeights,
    pub enable_fuzzy_matching: bool,
    pub enable_type_matching: bool,
    pub enable_partial_matching: bool,
    pub max_partial_match_ratio: f64,
    pub ignore_weekends: bool,
    pub timezone: TimezoneMode,
    pub max_candidates_per_transaction: usize,
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchWeights {
    pub amount: f64,
    pub date: f64,
    #[serde(rename = "type")]
    pub kind: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            amount: 0.5,
            date: 0.3,
            kind: 0.2,
        }
    }
}

impl MatchWeights {
    pub fn sum(&self) -> f64 {
        self.amount + self.date + self.kind
    }
}

// ---------------------------------------------------------------------------
// Timezone handling
// ---------------------------------------------------------------------------

/// How transaction timestamps are brought onto the statement calendar.
///
/// In TOML: `timezone = "utc" | "local" | "date_only"` or
/// `timezone = { business = "America/New_York" }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimezoneMode {
    Utc,
    Local,
    /// Midnight of the UTC calendar date.
    #[default]
    DateOnly,
    Business(String),
}

impl std::fmt::Display for TimezoneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utc => write!(f, "utc"),
            Self::Local => write!(f, "local"),
            Self::DateOnly => write!(f, "date_only"),
            Self::Business(zone) => write!(f, "business({zone})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

impl Default for MatchingConfig {
    /// ±1 day, exact amounts, 0.8 minimum confidence.
    fn default() -> Self {
        Self {
            date_tolerance_days: 1,
            amount_precision: 2,
            amount_tolerance_percent: Decimal::ZERO,
            min_confidence_score: 0.8,
            weights: MatchWeights::default(),
            enable_fuzzy_matching: true,
            enable_type_matching: true,
            enable_partial_matching: false,
            max_partial_match_ratio: 0.1,
            ignore_weekends: false,
            timezone: TimezoneMode::DateOnly,
            max_candidates_per_transaction: 10,
        }
    }
}

impl MatchingConfig {
    /// Same day, exact amount, 0.95 minimum confidence.
    pub fn strict() -> Self {
        Self {
            date_tolerance_days: 0,
            amount_tolerance_percent: Decimal::ZERO,
            min_confidence_score: 0.95,
            enable_fuzzy_matching: false,
            ..Self::default()
        }
    }

    /// ±3 business days, 1% amount tolerance, 0.6 minimum confidence.
    pub fn relaxed() -> Self {
        Self {
            date_tolerance_days: 3,
            amount_tolerance_percent: Decimal::ONE,
            min_confidence_score: 0.6,
            ignore_weekends: true,
            enable_partial_matching: true,
            max_candidates_per_transaction: 20,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchingConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: MatchingConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validated()
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_tolerance_days < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "date_tolerance_days must be >= 0, got {}",
                self.date_tolerance_days
            )));
        }

        if self.amount_precision > 10 {
            return Err(ReconError::ConfigValidation(format!(
                "amount_precision must be between 0 and 10, got {}",
                self.amount_precision
            )));
        }

        if self.amount_tolerance_percent < Decimal::ZERO
            || self.amount_tolerance_percent > Decimal::ONE_HUNDRED
        {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance_percent must be between 0 and 100, got {}",
                self.amount_tolerance_percent
            )));
        }

        if self.max_candidates_per_transaction == 0 {
            return Err(ReconError::ConfigValidation(
                "max_candidates_per_transaction must be positive".into(),
            ));
        }

        check_unit_interval("min_confidence_score", self.min_confidence_score)?;
        check_unit_interval("max_partial_match_ratio", self.max_partial_match_ratio)?;
        check_unit_interval("weights.amount", self.weights.amount)?;
        check_unit_interval("weights.date", self.weights.date)?;
        check_unit_interval("weights.type", self.weights.kind)?;

        let sum = self.weights.sum();
        if !(0.9..=1.1).contains(&sum) {
            return Err(ReconError::ConfigValidation(format!(
                "weights must sum to 1.0 (±0.1), got {sum:.3}"
            )));
        }

        if let TimezoneMode::Business(zone) = &self.timezone {
            zone.parse::<Tz>()
                .map_err(|_| ReconError::UnknownTimezone(zone.clone()))?;
        }

        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ReconError::ConfigValidation(format!(
            "{name} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

impl MatchingConfig {
    /// Absolute amount tolerance for a magnitude, rounded half away from zero.
    pub fn amount_tolerance(&self, magnitude: Decimal) -> Decimal {
        if self.amount_tolerance_percent.is_zero() {
            return Decimal::ZERO;
        }
        // Saturates for magnitudes near Decimal::MAX
        magnitude
            .abs()
            .checked_mul(self.amount_tolerance_percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .map(|raw| {
                raw.round_dp_with_strategy(self.amount_precision, RoundingStrategy::MidpointAwayFromZero)
            })
            .unwrap_or(Decimal::MAX)
    }

    /// Whether two normalized timestamps are close enough to be the same event.
    pub fn is_within_date_tolerance(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        if self.date_tolerance_days == 0 {
            return a.date() == b.date();
        }

        if self.ignore_weekends {
            let (start, end) = if a <= b { (a.date(), b.date()) } else { (b.date(), a.date()) };
            let mut business_days = 0;
            for day in start.iter_days().take_while(|d| *d < end) {
                if !is_weekend(day) {
                    business_days += 1;
                }
                if business_days > self.date_tolerance_days {
                    return false;
                }
            }
            return true;
        }

        let elapsed = if a >= b { a - b } else { b - a };
        chrono::Duration::try_days(self.date_tolerance_days).map_or(true, |max| elapsed <= max)
    }

    /// Wall-clock time of `t` under the configured timezone mode.
    pub fn normalize_time(&self, t: DateTime<Utc>) -> NaiveDateTime {
        match &self.timezone {
            TimezoneMode::Utc => t.naive_utc(),
            TimezoneMode::Local => t.with_timezone(&chrono::Local).naive_local(),
            TimezoneMode::DateOnly => t.date_naive().and_time(NaiveTime::MIN),
            TimezoneMode::Business(zone) => match zone.parse::<Tz>() {
                Ok(tz) => t.with_timezone(&tz).naive_local(),
                Err(_) => t.naive_utc(),
            },
        }
    }
}

/// Statement dates carry no zone; they sit at midnight on their own calendar.
pub fn statement_time(posted_on: NaiveDate) -> NaiveDateTime {
    posted_on.and_time(NaiveTime::MIN)
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Non-weekend days in `[earlier, later)`.
pub fn business_days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    start
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| !is_weekend(*d))
        .count() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
