//! Pairs every case row with the baseline row(s) of the same repetition and
//! averages the row differences per case.
//!
//! This is a mean of differences. It agrees with the difference of means
//! when each case covers the same repetitions as the baseline with the same
//! number of rows per repetition.
//!
//! A repetition the case never observed is skipped, whatever the baseline
//! holds for it. Row-wise frame subtraction would reject that when the
//! baseline has two or more rows for the repetition; here it only means the
//! case contributes no differences for it.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::{AggregateError, AggregateOptions, CaseDiffs, MeanAccumulator, difference};
use crate::dataset::{Dataset, Repetition, Values};

pub fn baseline_diffs(dataset: &Dataset, opts: &AggregateOptions) -> Result<CaseDiffs, AggregateError> {
    let baseline = opts.baseline.as_str();

    let mut baseline_rows: FxHashMap<&Repetition, Vec<Values>> = FxHashMap::default();
    // BTreeMap keeps the pairing order, and so the summation order, stable.
    let mut case_rows: BTreeMap<(&str, &Repetition), Vec<Values>> = BTreeMap::new();
    for obs in dataset {
        if obs.case == baseline {
            baseline_rows.entry(&obs.repetition).or_default().push(obs.values());
        } else {
            case_rows
                .entry((obs.case.as_str(), &obs.repetition))
                .or_default()
                .push(obs.values());
        }
    }

    if baseline_rows.is_empty() {
        return Err(AggregateError::MissingBaseline {
            baseline: baseline.to_string(),
        });
    }

    let mut per_case: BTreeMap<&str, MeanAccumulator> = BTreeMap::new();
    for ((case, repetition), rows) in &case_rows {
        let base = baseline_rows.get(repetition).map(Vec::as_slice).unwrap_or(&[]);
        // a single baseline row is broadcast across all rows of the repetition
        let broadcast = base.len() == 1;
        if !broadcast && base.len() != rows.len() {
            return Err(AggregateError::RepetitionMismatch {
                case: case.to_string(),
                repetition: (*repetition).clone(),
                case_rows: rows.len(),
                baseline_rows: base.len(),
            });
        }

        let acc = per_case.entry(*case).or_default();
        for (idx, row) in rows.iter().enumerate() {
            let base_row = if broadcast { &base[0] } else { &base[idx] };
            acc.add(&difference(row, base_row));
        }
    }

    tracing::trace!(cases = per_case.len(), repetitions = baseline_rows.len(), "nested loop paired rows");

    Ok(per_case
        .into_iter()
        .map(|(case, acc)| (case.to_string(), acc.mean()))
        .collect())
}
