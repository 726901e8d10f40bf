use crate::config::MatchingConfig;
use crate::model::{MatchType, ScoreBreakdown};

pub const EXACT_THRESHOLD: f64 = 0.95;
pub const CLOSE_THRESHOLD: f64 = 0.85;
pub const FUZZY_THRESHOLD: f64 = 0.70;
/// Minimum date sub-score for an Exact classification.
pub const EXACT_DATE_SCORE: f64 = 0.9;

/// Classify a scored pair. Rules are checked in order; the first hit wins.
pub fn classify_match(confidence: f64, scores: &ScoreBreakdown, config: &MatchingConfig) -> MatchType {
    if confidence >= EXACT_THRESHOLD && scores.amount == 1.0 && scores.date >= EXACT_DATE_SCORE {
        MatchType::Exact
    } else if confidence >= CLOSE_THRESHOLD {
        MatchType::Close
    } else if confidence >= FUZZY_THRESHOLD && config.enable_fuzzy_matching {
        MatchType::Fuzzy
    } else if confidence >= config.min_confidence_score {
        MatchType::Possible
    } else {
        MatchType::None
    }
}
