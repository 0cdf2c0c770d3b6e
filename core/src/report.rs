//! Optional on-disk snapshot of a benchmark run: `latest.json`/`latest.csv`
//! plus timestamped copies under `history/`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::harness::{BenchReport, TimingSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub strategy: String,
    pub legacy_name: String,
    pub title: String,
    #[serde(flatten)]
    pub summary: TimingSummary,
    pub samples_ns: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub generated_at: String,
    pub fixture: Option<String>,
    pub rows: usize,
    pub iterations: usize,
    pub notes: Option<String>,
    pub metrics: Vec<StrategyMetrics>,
}

impl RunRecord {
    pub fn from_report(
        report: &BenchReport,
        fixture: Option<&Path>,
        rows: usize,
        notes: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metrics = report
            .timings
            .iter()
            .map(|t| StrategyMetrics {
                strategy: t.strategy.key().to_string(),
                legacy_name: t.strategy.legacy_key().to_string(),
                title: t.strategy.title().to_string(),
                summary: t.summary(),
                samples_ns: t.samples.iter().map(|d| d.as_nanos() as u64).collect(),
            })
            .collect();
        Self {
            generated_at: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            fixture: fixture.map(|p| p.display().to_string()),
            rows,
            iterations: report.iterations,
            notes,
            metrics,
        }
    }
}

/// Files produced by [`write_run`].
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub latest_json: PathBuf,
    pub latest_csv: PathBuf,
    pub history_json: PathBuf,
}

pub fn write_run(output_dir: &Path, record: &RunRecord, timestamp: DateTime<Utc>) -> Result<WrittenReport> {
    let history_dir = output_dir.join("history");
    fs::create_dir_all(&history_dir).with_context(|| format!("create history directory {}", history_dir.display()))?;

    let stamp = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let latest_json = output_dir.join("latest.json");
    let latest_csv = output_dir.join("latest.csv");
    let history_json = history_dir.join(format!("{}.json", stamp));

    write_json(&latest_json, record)?;
    write_csv(&latest_csv, &record.metrics)?;
    write_json(&history_json, record)?;
    write_csv(&history_dir.join(format!("{}.csv", stamp)), &record.metrics)?;

    tracing::info!(dir = %output_dir.display(), "run report written");
    Ok(WrittenReport {
        latest_json,
        latest_csv,
        history_json,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).with_context(|| format!("write {}", path.display()))
}

pub fn write_csv(path: &Path, metrics: &[StrategyMetrics]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).with_context(|| format!("create {}", path.display()))?);
    writeln!(
        writer,
        "strategy,legacy_name,runs,mean_ns,median_ns,std_dev_ns,min_ns,max_ns,p50_ns,p95_ns,p99_ns"
    )?;
    for metric in metrics {
        let s = &metric.summary;
        writeln!(
            writer,
            "{},{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}",
            metric.strategy,
            metric.legacy_name,
            s.runs,
            s.mean_ns,
            s.median_ns,
            s.std_dev_ns,
            s.min_ns,
            s.max_ns,
            s.p50_ns,
            s.p95_ns,
            s.p99_ns
        )?;
    }
    writer.flush()?;
    Ok(())
}
