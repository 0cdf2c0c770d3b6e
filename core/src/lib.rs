pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod fixture;
pub mod harness;
pub mod report;

pub use aggregate::{AggregateError, AggregateOptions, CaseDiffs, CaseMatch, CaseMeans, Strategy};
pub use dataset::{Dataset, Observation, Repetition};
pub use harness::{BenchOptions, BenchReport, run_benchmark, verify_agreement};
