use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateOptions, CaseMatch, Strategy};
use crate::dataset::{BASELINE, format};
use crate::harness::{BenchOptions, DEFAULT_ITERATIONS, DEFAULT_TOLERANCE};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "groupbench.toml";

/// Fixture read when neither the config nor the command line names one.
pub const DEFAULT_FIXTURE: &str = "py_sim_data.json";

/// Settings read from a TOML, YAML or JSON file. Every field is optional;
/// command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub fixture: Option<PathBuf>,
    pub iterations: Option<usize>,
    pub warmup: Option<usize>,
    pub strategies: Option<Vec<String>>,
    pub baseline: Option<String>,
    pub case_match: Option<CaseMatch>,
    pub tolerance: Option<f64>,
    pub output_dir: Option<PathBuf>,
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        format::read_file(path).with_context(|| format!("load config {}", path.display()))
    }

    /// Load `explicit` if given, else `groupbench.toml` under `dir` if present, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config file");
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    pub fn fixture_path(&self) -> PathBuf {
        self.fixture.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE))
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }

    pub fn strategies(&self) -> Result<Vec<Strategy>> {
        match &self.strategies {
            None => Ok(Strategy::ALL.to_vec()),
            Some(names) if names.is_empty() => Err(anyhow!("config lists no strategies")),
            Some(names) => names
                .iter()
                .map(|name| name.parse::<Strategy>().map_err(|e| anyhow!(e)))
                .collect(),
        }
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            baseline: self.baseline.clone().unwrap_or_else(|| BASELINE.to_string()),
            case_match: self.case_match.unwrap_or_default(),
        }
    }

    pub fn bench_options(&self) -> Result<BenchOptions> {
        Ok(BenchOptions {
            iterations: self.iterations.unwrap_or(DEFAULT_ITERATIONS),
            warmup: self.warmup.unwrap_or(0),
            strategies: self.strategies()?,
            aggregate: self.aggregate_options(),
        })
    }
}
