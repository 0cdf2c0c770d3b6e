//! Baseline-relative group aggregation.
//!
//! Every strategy reduces a [`Dataset`] to [`CaseDiffs`]: the per-variable
//! mean of each case minus the per-variable mean of the baseline case, with
//! the baseline itself left out. They differ only in how they get there,
//! which is what the harness measures.

mod error;
pub mod group_aggregate;
pub mod nested_loop;
pub mod record_list;

#[cfg(test)]
mod aggregate_test;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::{BASELINE, Dataset, VAR_COUNT, Values};

pub use error::AggregateError;

/// Case label -> per-variable means.
pub type CaseMeans = BTreeMap<String, Values>;

/// Non-baseline case label -> per-variable difference against the baseline means.
pub type CaseDiffs = BTreeMap<String, Values>;

/// How the record-list strategy decides which records belong to a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMatch {
    #[default]
    Exact,
    /// A record joins every case whose label is contained in its own label.
    /// Reproduces the legacy grouping; "A" absorbs the rows of "AB".
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub baseline: String,
    pub case_match: CaseMatch,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            baseline: BASELINE.to_string(),
            case_match: CaseMatch::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NestedLoop,
    GroupAggregate,
    RecordList,
}

impl Strategy {
    /// Benchmark order used when no explicit selection is given.
    pub const ALL: [Strategy; 3] = [Strategy::GroupAggregate, Strategy::RecordList, Strategy::NestedLoop];

    pub fn key(self) -> &'static str {
        match self {
            Strategy::NestedLoop => "nested_loop",
            Strategy::GroupAggregate => "group_aggregate",
            Strategy::RecordList => "record_list",
        }
    }

    /// Names the timings were published under by the older benchmark script.
    pub fn legacy_key(self) -> &'static str {
        match self {
            Strategy::NestedLoop => "forLoop",
            Strategy::GroupAggregate => "pandasDF",
            Strategy::RecordList => "dicts",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Strategy::NestedLoop => "Per-repetition differences, averaged per case",
            Strategy::GroupAggregate => "Single grouped reduction",
            Strategy::RecordList => "Field-mapping records with manual sums",
        }
    }

    pub fn run(self, dataset: &Dataset, opts: &AggregateOptions) -> Result<CaseDiffs, AggregateError> {
        match self {
            Strategy::NestedLoop => nested_loop::baseline_diffs(dataset, opts),
            Strategy::GroupAggregate => group_aggregate::baseline_diffs(dataset, opts),
            Strategy::RecordList => record_list::baseline_diffs(dataset, opts),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Strategy::ALL
            .into_iter()
            .find(|st| st.key().eq_ignore_ascii_case(&normalized) || st.legacy_key().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| {
                format!(
                    "unknown strategy '{}' (expected one of: nested_loop, group_aggregate, record_list)",
                    s
                )
            })
    }
}

/// Running per-variable sum and row count for one group.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanAccumulator {
    sums: Values,
    count: usize,
}

impl MeanAccumulator {
    #[inline]
    pub(crate) fn add(&mut self, values: &Values) {
        for (sum, v) in self.sums.iter_mut().zip(values) {
            *sum += v;
        }
        self.count += 1;
    }

    pub(crate) fn mean(&self) -> Values {
        let n = self.count as f64;
        let mut out = [0.0; VAR_COUNT];
        for (slot, sum) in out.iter_mut().zip(&self.sums) {
            *slot = sum / n;
        }
        out
    }
}

pub(crate) fn difference(lhs: &Values, rhs: &Values) -> Values {
    let mut out = [0.0; VAR_COUNT];
    for (idx, slot) in out.iter_mut().enumerate() {
        *slot = lhs[idx] - rhs[idx];
    }
    out
}

/// Subtract the baseline row from every other row and drop the baseline.
pub fn subtract_baseline(mut means: CaseMeans, baseline: &str) -> Result<CaseDiffs, AggregateError> {
    let base = means.remove(baseline).ok_or_else(|| AggregateError::MissingBaseline {
        baseline: baseline.to_string(),
    })?;
    Ok(means
        .into_iter()
        .map(|(case, values)| {
            let diff = difference(&values, &base);
            (case, diff)
        })
        .collect())
}

/// Compare two results key by key, allowing `tolerance` absolute error per value.
pub fn diffs_close(lhs: &CaseDiffs, rhs: &CaseDiffs, tolerance: f64) -> bool {
    lhs.len() == rhs.len()
        && lhs.iter().zip(rhs).all(|((lk, lv), (rk, rv))| {
            lk == rk && lv.iter().zip(rv).all(|(a, b)| (a - b).abs() <= tolerance)
        })
}
