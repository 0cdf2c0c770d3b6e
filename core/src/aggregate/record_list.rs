//! Converts the dataset into plain field mappings and aggregates by hand.

use std::collections::BTreeMap;

use super::{AggregateError, AggregateOptions, CaseDiffs, CaseMatch, CaseMeans, subtract_baseline};
use crate::dataset::{Dataset, Repetition, VAR_COUNT, VARIABLES, Values};

/// One cell of a record. Numbers stay `f64` so non-finite values survive.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    Repetition(Repetition),
    Number(f64),
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Number(v) => Some(*v),
            _ => None,
        }
    }
}

pub type Record = BTreeMap<String, Field>;

/// One mapping per observation: `case`, `repetition` and every variable.
pub fn to_records(dataset: &Dataset) -> Vec<Record> {
    dataset
        .iter()
        .map(|obs| {
            let mut record = Record::new();
            record.insert("case".to_string(), Field::Text(obs.case.clone()));
            record.insert("repetition".to_string(), Field::Repetition(obs.repetition.clone()));
            for (name, value) in VARIABLES.iter().zip(obs.values()) {
                record.insert((*name).to_string(), Field::Number(value));
            }
            record
        })
        .collect()
}

pub fn baseline_diffs(dataset: &Dataset, opts: &AggregateOptions) -> Result<CaseDiffs, AggregateError> {
    diffs_from_records(&to_records(dataset), opts)
}

/// Partition `records` by case, average each partition and subtract the baseline.
pub fn diffs_from_records(records: &[Record], opts: &AggregateOptions) -> Result<CaseDiffs, AggregateError> {
    let baseline = opts.baseline.as_str();
    let labelled = records
        .iter()
        .enumerate()
        .map(|(idx, record)| -> Result<(usize, &str, &Record), AggregateError> {
            let label = record
                .get("case")
                .and_then(Field::as_str)
                .ok_or_else(|| AggregateError::MissingField {
                    index: idx,
                    field: "case".to_string(),
                })?;
            Ok((idx, label, record))
        })
        .collect::<Result<Vec<_>, AggregateError>>()?;

    let mut cases: Vec<&str> = Vec::new();
    for (_, case, _) in &labelled {
        if *case != baseline && !cases.contains(case) {
            cases.push(*case);
        }
    }

    let mut means = CaseMeans::new();
    let baseline_group = members(&labelled, baseline, opts.case_match);
    if baseline_group.is_empty() {
        return Err(AggregateError::MissingBaseline {
            baseline: baseline.to_string(),
        });
    }
    means.insert(baseline.to_string(), group_mean(&baseline_group)?);

    for case in cases {
        let group = members(&labelled, case, opts.case_match);
        means.insert(case.to_string(), group_mean(&group)?);
    }

    subtract_baseline(means, baseline)
}

fn members<'a>(labelled: &[(usize, &str, &'a Record)], case: &str, mode: CaseMatch) -> Vec<(usize, &'a Record)> {
    labelled
        .iter()
        .filter(|(_, label, _)| match mode {
            CaseMatch::Exact => *label == case,
            CaseMatch::Substring => label.contains(case),
        })
        .map(|(idx, _, record)| (*idx, *record))
        .collect()
}

fn group_mean(group: &[(usize, &Record)]) -> Result<Values, AggregateError> {
    let mut out = [0.0; VAR_COUNT];
    for (slot, name) in out.iter_mut().zip(VARIABLES) {
        let mut total = 0.0;
        for (idx, record) in group {
            total += record
                .get(name)
                .and_then(Field::as_f64)
                .ok_or_else(|| AggregateError::MissingField {
                    index: *idx,
                    field: name.to_string(),
                })?;
        }
        *slot = total / group.len() as f64;
    }
    Ok(out)
}
