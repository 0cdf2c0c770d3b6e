//! Reference strategy: one grouped reduction, then a row subtraction.

use rustc_hash::FxHashMap;

use super::{AggregateError, AggregateOptions, CaseDiffs, CaseMeans, MeanAccumulator, subtract_baseline};
use crate::dataset::Dataset;

/// Per-case means over every observation of the case.
pub fn case_means(dataset: &Dataset) -> CaseMeans {
    let mut groups: FxHashMap<&str, MeanAccumulator> = FxHashMap::default();
    for obs in dataset {
        groups.entry(obs.case.as_str()).or_default().add(&obs.values());
    }
    groups
        .into_iter()
        .map(|(case, acc)| (case.to_string(), acc.mean()))
        .collect()
}

pub fn baseline_diffs(dataset: &Dataset, opts: &AggregateOptions) -> Result<CaseDiffs, AggregateError> {
    subtract_baseline(case_means(dataset), &opts.baseline)
}
