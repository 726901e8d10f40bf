use std::path::PathBuf;

use chrono::NaiveDate;
use ledgermatch_recon::resolver::ResolutionStrategy;
use ledgermatch_recon::{
    BankStatementEntry, EdgeCaseResolver, ErrorCategory, MatchType, MatchingConfig, MatchingEngine,
    ReconError, ReconciliationResult, Transaction,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_config(name: &str) -> MatchingConfig {
    MatchingConfig::from_toml(&read_fixture(name)).unwrap()
}

fn load_engine(config: MatchingConfig) -> MatchingEngine {
    let transactions: Vec<Transaction> = serde_json::from_str(&read_fixture("transactions.json")).unwrap();
    let statements: Vec<BankStatementEntry> = serde_json::from_str(&read_fixture("statements.json")).unwrap();
    for tx in &transactions {
        tx.validate().unwrap();
    }
    for entry in &statements {
        entry.validate().unwrap();
    }

    let mut engine = MatchingEngine::new(config).unwrap();
    engine.load_transactions(transactions);
    engine.load_statements(statements);
    engine
}

fn pairs(result: &ReconciliationResult) -> Vec<(&str, &str)> {
    result
        .matches
        .iter()
        .map(|m| (m.transaction.id.as_str(), m.statement.id.as_str()))
        .collect()
}

fn unmatched_tx_ids(result: &ReconciliationResult) -> Vec<&str> {
    result.unmatched_transactions.iter().map(|t| t.id.as_str()).collect()
}

// -------------------------------------------------------------------------
// Config fixtures
// -------------------------------------------------------------------------

#[test]
fn fixture_configs_match_presets() {
    assert_eq!(load_config("default.recon.toml"), MatchingConfig::default());
    assert_eq!(load_config("relaxed.recon.toml"), MatchingConfig::relaxed());
}

#[test]
fn bad_weights_rejected() {
    let err = MatchingConfig::from_toml(&read_fixture("bad-weights.recon.toml")).unwrap_err();
    assert!(matches!(err, ReconError::ConfigValidation(_)));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("weights must sum"));
}

// -------------------------------------------------------------------------
// Default preset
// -------------------------------------------------------------------------

#[test]
fn default_preset_only_takes_same_day_exact_pairs() {
    let mut engine = load_engine(load_config("default.recon.toml"));
    let result = engine.reconcile().unwrap();

    assert_eq!(pairs(&result), vec![("t-001", "s-101"), ("t-004", "s-104")]);
    assert!(result.matches.iter().all(|m| m.match_type == MatchType::Exact));
    assert_eq!(unmatched_tx_ids(&result), vec!["t-002", "t-003", "t-005", "t-006", "t-007"]);
    assert_eq!(result.unmatched_statements.len(), 5);
    assert!(result.anomalies.is_empty());

    let summary = &result.summary;
    assert!(summary.is_consistent());
    assert_eq!(summary.total_transactions, 7);
    assert_eq!(summary.total_statements, 7);
    assert_eq!(summary.match_type_counts.get(&MatchType::Exact), Some(&2));
    assert_eq!(summary.matched_amount.to_string(), "239.99");
}

#[test]
fn one_day_gap_exhausts_default_date_tolerance() {
    let engine = load_engine(MatchingConfig::default());
    let t002 = engine.transaction_index().unwrap().records()[1].clone();
    let options = engine.find_matches(&t002).unwrap();
    // s-102 is a candidate but its date score decays to zero, leaving 0.7
    assert!(options.is_empty());
}

// -------------------------------------------------------------------------
// Relaxed preset
// -------------------------------------------------------------------------

#[test]
fn relaxed_preset_bridges_weekend_and_yields_duplicate() {
    let mut engine = load_engine(load_config("relaxed.recon.toml"));
    let result = engine.reconcile().unwrap();

    assert_eq!(
        pairs(&result),
        vec![
            ("t-001", "s-101"),
            ("t-002", "s-102"),
            ("t-003", "s-103"),
            ("t-004", "s-104"),
        ]
    );
    // Friday to Monday counts as one business day of three
    let weekend = &result.matches[2];
    assert_eq!(weekend.match_type, MatchType::Close);
    assert_eq!(weekend.date_delta_days, -3);
    assert!((weekend.confidence - 0.9).abs() < 1e-9);

    // t-005 loses s-104 to t-004 and does not fall back
    assert_eq!(unmatched_tx_ids(&result), vec!["t-005", "t-006", "t-007"]);
    assert!(result.summary.is_consistent());
}

#[test]
fn edge_case_report_on_relaxed_run() {
    let mut engine = load_engine(MatchingConfig::relaxed());
    let result = engine.reconcile().unwrap();
    let resolver = EdgeCaseResolver::new(&engine);
    let report = resolver.analyze(&result).unwrap();

    assert_eq!(report.duplicates.len(), 1);
    let dup_ids: Vec<&str> = report.duplicates[0].transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(dup_ids, vec!["t-004", "t-005"]);
    assert!((report.duplicates[0].confidence - 0.9).abs() < 1e-9);

    assert_eq!(report.partial_matches.len(), 1);
    let split = &report.partial_matches[0];
    assert_eq!(split.transaction.id, "t-006");
    let mut parts: Vec<&str> = split.statements.iter().map(|s| s.id.as_str()).collect();
    parts.sort_unstable();
    assert_eq!(parts, vec!["s-105", "s-106"]);
    assert_eq!(split.total.to_string(), "300.00");

    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    let dates: Vec<NaiveDate> = report.same_day.iter().map(|a| a.date).collect();
    assert_eq!(dates, vec![day(4), day(5), day(6)]);
    assert_eq!(report.same_day[0].strategy, ResolutionStrategy::SplittingNeeded);
    assert_eq!(report.same_day[2].strategy, ResolutionStrategy::NoMatchesFound);
}

#[test]
fn strict_preset_matches_fixture_subset() {
    let mut engine = load_engine(MatchingConfig::strict());
    let result = engine.reconcile().unwrap();
    assert_eq!(pairs(&result), vec![("t-001", "s-101"), ("t-004", "s-104")]);
    assert!(result.summary.is_consistent());
}

// -------------------------------------------------------------------------
// Reporting contract
// -------------------------------------------------------------------------

#[test]
fn result_serializes_for_reporting() {
    let mut engine = load_engine(MatchingConfig::default());
    let result = engine.reconcile().unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["matches"][0]["match_type"], "exact");
    assert_eq!(json["matches"][0]["scores"]["type"], 1.0);
    assert_eq!(json["matches"][0]["transaction"]["direction"], "credit");
    assert_eq!(json["summary"]["matched_transactions"], 2);
    assert!(json["matches"][0]["reasons"].as_array().unwrap().len() == 3);
}

#[test]
fn reloading_restarts_the_cycle() {
    let mut engine = load_engine(MatchingConfig::default());
    engine.reconcile().unwrap();

    engine.load_statements(Vec::new());
    let err = engine.reconcile().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Precondition);
}
