use super::*;
use crate::dataset::{Observation, Repetition};
use crate::fixture;

const TOL: f64 = 1e-9;

fn scenario() -> Dataset {
    Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 2.0, 3.0]),
        Observation::new("A", 1, [3.0, 4.0, 5.0]),
        Observation::new("baseline", 2, [1.0, 2.0, 3.0]),
        Observation::new("A", 2, [3.0, 4.0, 5.0]),
    ])
}

fn assert_values_close(actual: &Values, expected: &Values) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() <= TOL, "expected {:?}, got {:?}", expected, actual);
    }
}

#[test]
fn test_scenario_all_strategies() {
    let ds = scenario();
    let opts = AggregateOptions::default();

    let means = group_aggregate::case_means(&ds);
    assert_values_close(&means["baseline"], &[1.0, 2.0, 3.0]);
    assert_values_close(&means["A"], &[3.0, 4.0, 5.0]);

    for strategy in Strategy::ALL {
        let diffs = strategy.run(&ds, &opts).expect("scenario has a baseline");
        assert_eq!(diffs.len(), 1, "{} returned {:?}", strategy, diffs);
        assert_values_close(&diffs["A"], &[2.0, 2.0, 2.0]);
    }
}

#[test]
fn test_baseline_never_in_output() {
    let ds = fixture::synthesize(6, 3);
    let opts = AggregateOptions::default();
    for strategy in Strategy::ALL {
        let diffs = strategy.run(&ds, &opts).unwrap();
        assert!(!diffs.contains_key("baseline"), "{} kept the baseline", strategy);
        assert_eq!(diffs.len(), 6);
    }
}

#[test]
fn test_baseline_only_dataset_yields_empty_diffs() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("baseline", 2, [3.0, 3.0, 3.0]),
    ]);
    for strategy in Strategy::ALL {
        assert!(strategy.run(&ds, &AggregateOptions::default()).unwrap().is_empty());
    }
}

#[test]
fn test_missing_baseline_is_rejected_by_every_strategy() {
    let ds = Dataset::new(vec![Observation::new("A", 1, [1.0, 2.0, 3.0])]);
    for strategy in Strategy::ALL {
        let err = strategy.run(&ds, &AggregateOptions::default()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::MissingBaseline {
                baseline: "baseline".to_string()
            }
        );
    }
    let empty = Dataset::default();
    assert!(matches!(
        Strategy::GroupAggregate.run(&empty, &AggregateOptions::default()),
        Err(AggregateError::MissingBaseline { .. })
    ));
}

#[test]
fn test_custom_baseline_label() {
    let ds = Dataset::new(vec![
        Observation::new("control", 1, [2.0, 2.0, 2.0]),
        Observation::new("treated", 1, [5.0, 1.0, 2.0]),
    ]);
    let opts = AggregateOptions {
        baseline: "control".to_string(),
        ..Default::default()
    };
    for strategy in Strategy::ALL {
        let diffs = strategy.run(&ds, &opts).unwrap();
        assert_values_close(&diffs["treated"], &[3.0, -1.0, 0.0]);
    }
}

#[test]
fn test_group_aggregate_matches_record_list() {
    let ds = fixture::synthesize(25, 7);
    let opts = AggregateOptions::default();
    let reference = Strategy::GroupAggregate.run(&ds, &opts).unwrap();
    let records = Strategy::RecordList.run(&ds, &opts).unwrap();
    assert!(diffs_close(&reference, &records, TOL));
    for idx in 1..=25 {
        assert_values_close(&reference[&fixture::case_label(idx)], &fixture::expected_diff(idx));
    }
}

#[test]
fn test_strategies_agree_on_balanced_fixture() {
    let ds = fixture::synthesize(10, 4);
    let opts = AggregateOptions::default();
    let reference = Strategy::GroupAggregate.run(&ds, &opts).unwrap();
    let looped = Strategy::NestedLoop.run(&ds, &opts).unwrap();
    assert!(diffs_close(&reference, &looped, TOL));
}

#[test]
fn test_idempotent() {
    let ds = fixture::synthesize(8, 3);
    let opts = AggregateOptions::default();
    for strategy in Strategy::ALL {
        let first = strategy.run(&ds, &opts).unwrap();
        let second = strategy.run(&ds, &opts).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_nested_loop_is_mean_of_differences() {
    // A only has repetition 1; the baseline mean also includes repetition 2.
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("baseline", 2, [5.0, 5.0, 5.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
    ]);
    let opts = AggregateOptions::default();
    let looped = Strategy::NestedLoop.run(&ds, &opts).unwrap();
    let reference = Strategy::GroupAggregate.run(&ds, &opts).unwrap();
    assert_values_close(&looped["A"], &[1.0, 1.0, 1.0]);
    assert_values_close(&reference["A"], &[-1.0, -1.0, -1.0]);
}

#[test]
fn test_nested_loop_broadcasts_single_baseline_row() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
        Observation::new("A", 1, [4.0, 4.0, 4.0]),
    ]);
    let diffs = Strategy::NestedLoop.run(&ds, &AggregateOptions::default()).unwrap();
    assert_values_close(&diffs["A"], &[2.0, 2.0, 2.0]);
}

#[test]
fn test_nested_loop_rejects_unpaired_repetition() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
        Observation::new("A", 2, [2.0, 2.0, 2.0]),
    ]);
    let err = Strategy::NestedLoop.run(&ds, &AggregateOptions::default()).unwrap_err();
    assert_eq!(
        err,
        AggregateError::RepetitionMismatch {
            case: "A".to_string(),
            repetition: Repetition::Index(2),
            case_rows: 1,
            baseline_rows: 0,
        }
    );
}

#[test]
fn test_nested_loop_rejects_row_count_mismatch() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("baseline", 1, [1.0, 1.0, 1.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
    ]);
    assert!(matches!(
        Strategy::NestedLoop.run(&ds, &AggregateOptions::default()),
        Err(AggregateError::RepetitionMismatch {
            case_rows: 3,
            baseline_rows: 2,
            ..
        })
    ));
}

#[test]
fn test_substring_matching_merges_contained_case_names() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [0.0, 0.0, 0.0]),
        Observation::new("A", 1, [2.0, 2.0, 2.0]),
        Observation::new("AB", 1, [4.0, 4.0, 4.0]),
    ]);
    let exact = Strategy::RecordList.run(&ds, &AggregateOptions::default()).unwrap();
    assert_values_close(&exact["A"], &[2.0, 2.0, 2.0]);
    assert_values_close(&exact["AB"], &[4.0, 4.0, 4.0]);

    let loose = AggregateOptions {
        case_match: CaseMatch::Substring,
        ..Default::default()
    };
    let merged = Strategy::RecordList.run(&ds, &loose).unwrap();
    // "A" also collects the "AB" row
    assert_values_close(&merged["A"], &[3.0, 3.0, 3.0]);
    assert_values_close(&merged["AB"], &[4.0, 4.0, 4.0]);
}

#[test]
fn test_substring_matching_agrees_when_names_are_disjoint() {
    let ds = fixture::synthesize(12, 2);
    let loose = AggregateOptions {
        case_match: CaseMatch::Substring,
        ..Default::default()
    };
    let reference = Strategy::GroupAggregate.run(&ds, &AggregateOptions::default()).unwrap();
    let records = Strategy::RecordList.run(&ds, &loose).unwrap();
    assert!(diffs_close(&reference, &records, TOL));
}

#[test]
fn test_record_missing_field() {
    let mut records = record_list::to_records(&scenario());
    records[2].remove("var2");
    let err = record_list::diffs_from_records(&records, &AggregateOptions::default()).unwrap_err();
    assert_eq!(
        err,
        AggregateError::MissingField {
            index: 2,
            field: "var2".to_string()
        }
    );
}

#[test]
fn test_to_records_fields() {
    let records = record_list::to_records(&scenario());
    assert_eq!(records.len(), 4);
    assert_eq!(records[1]["case"], record_list::Field::Text("A".to_string()));
    assert_eq!(records[1]["repetition"], record_list::Field::Repetition(Repetition::Index(1)));
    assert_eq!(records[1]["var3"].as_f64(), Some(5.0));
}

#[test]
fn test_record_without_case_label() {
    let mut records = record_list::to_records(&scenario());
    records[1].remove("case");
    let expected = AggregateError::MissingField {
        index: 1,
        field: "case".to_string(),
    };
    for case_match in [CaseMatch::Exact, CaseMatch::Substring] {
        let opts = AggregateOptions {
            case_match,
            ..Default::default()
        };
        assert_eq!(record_list::diffs_from_records(&records, &opts).unwrap_err(), expected);
    }

    records[1].insert("case".to_string(), record_list::Field::Number(7.0));
    assert_eq!(
        record_list::diffs_from_records(&records, &AggregateOptions::default()).unwrap_err(),
        expected
    );
}

#[test]
fn test_non_finite_values_flow_through_every_strategy() {
    let ds = Dataset::new(vec![
        Observation::new("baseline", 1, [1.0, 2.0, 3.0]),
        Observation::new("A", 1, [f64::NAN, 4.0, 5.0]),
        Observation::new("B", 1, [f64::INFINITY, 2.0, 3.0]),
    ]);
    for strategy in Strategy::ALL {
        let diffs = strategy
            .run(&ds, &AggregateOptions::default())
            .unwrap_or_else(|e| panic!("{} failed: {}", strategy, e));
        assert!(diffs["A"][0].is_nan(), "{} returned {:?}", strategy, diffs);
        assert!((diffs["A"][1] - 2.0).abs() <= TOL && (diffs["A"][2] - 2.0).abs() <= TOL);
        assert_eq!(diffs["B"][0], f64::INFINITY);
        assert_eq!(diffs["B"][1], 0.0);
    }
}

#[test]
fn test_strategy_names() {
    assert_eq!("group_aggregate".parse::<Strategy>(), Ok(Strategy::GroupAggregate));
    assert_eq!("nested-loop".parse::<Strategy>(), Ok(Strategy::NestedLoop));
    assert_eq!("dicts".parse::<Strategy>(), Ok(Strategy::RecordList));
    assert_eq!("forLoop".parse::<Strategy>(), Ok(Strategy::NestedLoop));
    assert_eq!("pandasDF".parse::<Strategy>(), Ok(Strategy::GroupAggregate));
    assert!("pivot".parse::<Strategy>().is_err());
}

#[test]
fn test_diffs_close() {
    let mut a = CaseDiffs::new();
    a.insert("A".to_string(), [1.0, 2.0, 3.0]);
    let mut b = a.clone();
    assert!(diffs_close(&a, &b, 0.0));
    b.insert("A".to_string(), [1.0, 2.0, 3.1]);
    assert!(!diffs_close(&a, &b, 1e-3));
    assert!(diffs_close(&a, &b, 0.2));
    b.insert("B".to_string(), [0.0; 3]);
    assert!(!diffs_close(&a, &b, 1.0));
}
