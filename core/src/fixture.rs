//! Deterministic synthetic datasets for benches, tests and `groupbench generate`.

use crate::dataset::{BASELINE, Dataset, Observation, VAR_COUNT, Values};

const BASE: Values = [10.0, 20.0, 30.0];
const STEP: Values = [1.0, 0.5, -0.25];
const SPREAD: f64 = 0.1;

/// Label of the `index`-th generated case (1-based). Zero padded so no
/// label is a substring of another.
pub fn case_label(index: usize) -> String {
    format!("case_{:03}", index)
}

/// A baseline plus `cases` cases, each observed over `repetitions` repetitions.
///
/// Repetition noise is symmetric around zero, so the mean of case `c` is
/// exactly `BASE + c * STEP` up to rounding and [`expected_diff`] predicts
/// every strategy's output.
pub fn synthesize(cases: usize, repetitions: usize) -> Dataset {
    let reps = repetitions.max(1);
    let centre = (reps - 1) as f64 / 2.0;
    let mut observations = Vec::with_capacity((cases + 1) * reps);
    for case_idx in 0..=cases {
        let label = if case_idx == 0 {
            BASELINE.to_string()
        } else {
            case_label(case_idx)
        };
        for rep in 0..reps {
            let noise = (rep as f64 - centre) * SPREAD;
            let mut values = [0.0; VAR_COUNT];
            for (k, slot) in values.iter_mut().enumerate() {
                *slot = BASE[k] + case_idx as f64 * STEP[k] + noise * (k + 1) as f64;
            }
            observations.push(Observation::new(label.clone(), rep as i64, values));
        }
    }
    Dataset::new(observations)
}

/// Difference against the baseline that [`synthesize`] builds into case `index`.
pub fn expected_diff(index: usize) -> Values {
    let mut out = [0.0; VAR_COUNT];
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = index as f64 * STEP[k];
    }
    out
}
