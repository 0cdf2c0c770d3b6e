//! Observation table loaded from a fixture file.
//!
//! Fixtures are either a bare list of observations or an object holding an
//! `observations` list. JSON, YAML and TOML are accepted; TOML needs the
//! object form since it has no top-level arrays.

pub mod format;


use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

pub use format::Format;

/// Case label every other case is compared against.
pub const BASELINE: &str = "baseline";

/// Numeric columns reduced by the aggregation strategies, in output order.
pub const VARIABLES: [&str; VAR_COUNT] = ["var1", "var2", "var3"];

pub const VAR_COUNT: usize = 3;

/// One value per entry of [`VARIABLES`].
pub type Values = [f64; VAR_COUNT];

/// Repetition key. Fixtures exported from data frames use integers, hand
/// written ones sometimes use labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repetition {
    Index(i64),
    Label(String),
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repetition::Index(i) => write!(f, "{}", i),
            Repetition::Label(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Repetition {
    fn from(value: i64) -> Self {
        Repetition::Index(value)
    }
}

impl From<i32> for Repetition {
    fn from(value: i32) -> Self {
        Repetition::Index(i64::from(value))
    }
}

impl From<&str> for Repetition {
    fn from(value: &str) -> Self {
        Repetition::Label(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub case: String,
    // older fixtures carry the column under its misspelled name
    #[serde(alias = "repitition")]
    pub repetition: Repetition,
    pub var1: f64,
    pub var2: f64,
    pub var3: f64,
}

impl Observation {
    pub fn new(case: impl Into<String>, repetition: impl Into<Repetition>, values: Values) -> Self {
        let [var1, var2, var3] = values;
        Self {
            case: case.into(),
            repetition: repetition.into(),
            var1,
            var2,
            var3,
        }
    }

    #[inline]
    pub fn values(&self) -> Values {
        [self.var1, self.var2, self.var3]
    }
}

/// Ordered collection of observations. Strategies only ever borrow it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Load a fixture from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let dataset: Dataset =
            format::read_file(path).with_context(|| format!("load fixture {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            rows = dataset.len(),
            cases = dataset.cases().len(),
            "fixture loaded"
        );
        Ok(dataset)
    }

    /// Write the dataset in the format implied by the path's extension (JSON otherwise).
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = Format::from_path(path).unwrap_or(Format::Json);
        let encoded = format::to_string(self, format)?;
        std::fs::write(path, encoded).with_context(|| format!("write fixture {}", path.display()))
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn has_case(&self, case: &str) -> bool {
        self.observations.iter().any(|o| o.case == case)
    }

    /// Distinct case labels in first-seen order.
    pub fn cases(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for obs in &self.observations {
            if !seen.contains(&obs.case.as_str()) {
                seen.push(obs.case.as_str());
            }
        }
        seen
    }

    /// Distinct repetition keys in first-seen order.
    pub fn repetitions(&self) -> Vec<&Repetition> {
        let mut seen: Vec<&Repetition> = Vec::new();
        for obs in &self.observations {
            if !seen.contains(&&obs.repetition) {
                seen.push(&obs.repetition);
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

impl FromIterator<Observation> for Dataset {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Accepts either `[obs, ...]` or `{ "observations": [obs, ...] }`.
struct DatasetVisitor;

impl<'de> Visitor<'de> for DatasetVisitor {
    type Value = Dataset;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a list of observations or a table with an `observations` list")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Dataset, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut observations = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(obs) = seq.next_element::<Observation>()? {
            observations.push(obs);
        }
        Ok(Dataset::new(observations))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Dataset, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut observations: Option<Vec<Observation>> = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "observations" {
                if observations.is_some() {
                    return Err(serde::de::Error::duplicate_field("observations"));
                }
                observations = Some(map.next_value()?);
            } else {
                map.next_value::<serde::de::IgnoredAny>()?;
            }
        }
        let observations = observations.ok_or_else(|| serde::de::Error::missing_field("observations"))?;
        Ok(Dataset::new(observations))
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DatasetVisitor)
    }
}
