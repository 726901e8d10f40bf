use chrono::{Local, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::model::{BankStatementEntry, Transaction};

#[derive(Debug, Clone, Copy)]
enum TrialZone {
    Utc,
    Local,
    Named(Tz),
}

impl TrialZone {
    fn name(&self) -> &'static str {
        match self {
            Self::Utc => "UTC",
            Self::Local => "Local",
            Self::Named(tz) => tz.name(),
        }
    }

    fn local_date(&self, tx: &Transaction) -> NaiveDate {
        match self {
            Self::Utc => tx.occurred_at.date_naive(),
            Self::Local => tx.occurred_at.with_timezone(&Local).date_naive(),
            Self::Named(tz) => tx.occurred_at.with_timezone(tz).date_naive(),
        }
    }
}

const TRIAL_ZONES: [TrialZone; 10] = [
    TrialZone::Utc,
    TrialZone::Local,
    TrialZone::Named(chrono_tz::America::New_York),
    TrialZone::Named(chrono_tz::America::Chicago),
    TrialZone::Named(chrono_tz::America::Denver),
    TrialZone::Named(chrono_tz::America::Los_Angeles),
    TrialZone::Named(chrono_tz::Europe::London),
    TrialZone::Named(chrono_tz::Europe::Berlin),
    TrialZone::Named(chrono_tz::Asia::Tokyo),
    TrialZone::Named(chrono_tz::Australia::Sydney),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneTrial {
    pub zone: String,
    /// Transaction date in this zone minus the posted date.
    pub date_offset_days: i64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimezoneResolution {
    pub transaction_id: String,
    pub statement_id: String,
    pub best_zone: String,
    pub confidence: f64,
    pub trials: Vec<ZoneTrial>,
}

/// Coarse closeness of two calendar dates.
pub fn date_proximity_score(offset_days: i64) -> f64 {
    match offset_days.unsigned_abs() {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        3 => 0.4,
        _ => 0.0,
    }
}

/// Try every candidate zone and keep the one that best lines the transaction
/// up with the posted date. Posted dates have no zone and are never shifted.
/// On equal scores the earlier zone in the trial list wins.
pub fn resolve_timezone(tx: &Transaction, entry: &BankStatementEntry) -> TimezoneResolution {
    let trials: Vec<ZoneTrial> = TRIAL_ZONES
        .iter()
        .map(|zone| {
            let offset = (zone.local_date(tx) - entry.posted_on).num_days();
            ZoneTrial {
                zone: zone.name().to_string(),
                date_offset_days: offset,
                score: date_proximity_score(offset),
            }
        })
        .collect();

    let mut best = 0;
    for (i, trial) in trials.iter().enumerate() {
        if trial.score > trials[best].score {
            best = i;
        }
    }

    TimezoneResolution {
        transaction_id: tx.id.clone(),
        statement_id: entry.id.clone(),
        best_zone: trials[best].zone.clone(),
        confidence: trials[best].score,
        trials,
    }
}
