use std::fmt;

use crate::dataset::Repetition;

/// Failures raised while reducing a dataset to baseline-relative differences.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// No observation carries the baseline label.
    MissingBaseline { baseline: String },
    /// A case and the baseline disagree on how many rows one repetition has,
    /// so their rows cannot be paired.
    RepetitionMismatch {
        case: String,
        repetition: Repetition,
        case_rows: usize,
        baseline_rows: usize,
    },
    /// A record handed to the record-list strategy lacks a numeric field.
    MissingField { index: usize, field: String },
    InvalidIterations,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::MissingBaseline { baseline } => {
                write!(f, "dataset has no observations for baseline case '{}'", baseline)
            }
            AggregateError::RepetitionMismatch {
                case,
                repetition,
                case_rows,
                baseline_rows,
            } => write!(
                f,
                "case '{}' has {} row(s) for repetition {} but the baseline has {}",
                case, case_rows, repetition, baseline_rows
            ),
            AggregateError::MissingField { index, field } => {
                write!(f, "record {} has no numeric field '{}'", index, field)
            }
            AggregateError::InvalidIterations => write!(f, "iteration count must be at least 1"),
        }
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AggregateError::MissingBaseline {
            baseline: "baseline".to_string(),
        };
        assert_eq!(err.to_string(), "dataset has no observations for baseline case 'baseline'");

        let err = AggregateError::RepetitionMismatch {
            case: "A".to_string(),
            repetition: Repetition::Index(3),
            case_rows: 1,
            baseline_rows: 0,
        };
        assert_eq!(err.to_string(), "case 'A' has 1 row(s) for repetition 3 but the baseline has 0");
    }
}
