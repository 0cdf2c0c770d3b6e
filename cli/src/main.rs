use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Once;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use groupbench_core::{
    CaseMatch, Dataset, Strategy,
    config::BenchConfig,
    dataset::VARIABLES,
    fixture,
    harness::{self, BenchReport, stats::format_ns},
    report::{self, RunRecord},
};

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "groupbench_core=info,groupbench=info";


#[derive(Debug, Parser)]
#[command(
    name = "groupbench",
    author,
    version,
    about = "Benchmark strategies for baseline-relative group means",
    long_about = None
)]
struct CliArgs {
    /// Without a subcommand, `run` is executed with default settings
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Time every selected strategy over repeated runs.
    Run(RunArgs),
    /// Print the baseline-relative differences computed by one strategy as JSON.
    Diffs {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, short, value_parser = parse_strategy, default_value = "group_aggregate")]
        strategy: Strategy,
    },
    /// Write a synthetic fixture (format follows the file extension).
    Generate {
        #[arg(long, short, value_name = "FILE", value_parser = parse_sanitized_path)]
        output: PathBuf,
        /// Number of non-baseline cases
        #[arg(long, default_value_t = 10)]
        cases: usize,
        #[arg(long, default_value_t = 5)]
        repetitions: usize,
    },
}

#[derive(Debug, Default, Args)]
struct SourceArgs {
    /// Fixture file (JSON, YAML or TOML)
    #[arg(long, short, value_name = "FILE")]
    fixture: Option<PathBuf>,
    /// Config file; defaults to ./groupbench.toml when present
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Label of the reference case
    #[arg(long)]
    baseline: Option<String>,
    /// Group records by substring containment instead of exact labels (legacy behaviour)
    #[arg(long)]
    substring_match: bool,
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Timed runs per strategy
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64).range(1..))]
    iterations: Option<u64>,
    /// Untimed runs per strategy before measuring
    #[arg(long)]
    warmup: Option<usize>,
    /// Strategy to time (repeatable); defaults to all
    #[arg(long = "strategy", short, value_parser = parse_strategy)]
    strategies: Vec<Strategy>,
    /// Directory for latest.json / latest.csv and history snapshots
    #[arg(long, value_name = "DIR", value_parser = parse_sanitized_path)]
    output_dir: Option<PathBuf>,
    /// Free-form note stored with the report
    #[arg(long)]
    notes: Option<String>,
    /// Check that every strategy matches the grouped reduction before timing
    #[arg(long)]
    verify: bool,
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in output paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn parse_strategy(raw: &str) -> Result<Strategy, String> {
    raw.parse()
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `GROUPBENCH_TRACE=1` logs with `RUST_LOG` or the default filter,
/// any other non-false value is used as the filter itself.
fn maybe_init_tracing() {
    let raw = match std::env::var("GROUPBENCH_TRACE") {
        Ok(value) => value,
        Err(_) => return,
    };

    if !env_toggle_enabled(&raw) {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = filter_expr_from(&raw).or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

/// Config file values overlaid with the source flags.
fn resolve_config(source: &SourceArgs) -> anyhow::Result<BenchConfig> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let mut cfg = BenchConfig::discover(source.config.as_deref(), &cwd)?;
    if let Some(fixture) = &source.fixture {
        cfg.fixture = Some(fixture.clone());
    }
    if let Some(baseline) = &source.baseline {
        cfg.baseline = Some(baseline.clone());
    }
    if source.substring_match {
        cfg.case_match = Some(CaseMatch::Substring);
    }
    Ok(cfg)
}

fn apply_run_args(cfg: &mut BenchConfig, args: &RunArgs) {
    if let Some(n) = args.iterations {
        cfg.iterations = Some(n as usize);
    }
    if let Some(warmup) = args.warmup {
        cfg.warmup = Some(warmup);
    }
    if !args.strategies.is_empty() {
        cfg.strategies = Some(args.strategies.iter().map(|s| s.key().to_string()).collect());
    }
    if let Some(dir) = &args.output_dir {
        cfg.output_dir = Some(dir.clone());
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = resolve_config(&args.source)?;
    apply_run_args(&mut cfg, &args);
    let opts = cfg.bench_options()?;
    let fixture_path = cfg.fixture_path();
    let dataset = Dataset::load(&fixture_path)?;

    if args.verify {
        harness::verify_agreement(&dataset, &opts.strategies, &opts.aggregate, cfg.tolerance())
            .context("strategies disagree")?;
        println!("verified: all strategies agree within {}", cfg.tolerance());
    }

    let bench = harness::run_benchmark(&dataset, &opts)
        .with_context(|| format!("benchmark on {} failed", fixture_path.display()))?;
    print!("{}", render_summary(&bench));

    if let Some(dir) = &cfg.output_dir {
        let timestamp = chrono::Utc::now();
        let record = RunRecord::from_report(&bench, Some(fixture_path.as_path()), dataset.len(), args.notes, timestamp);
        let written = report::write_run(dir, &record, timestamp)?;
        println!(
            "Report written -> {}, {}, {}",
            written.latest_json.display(),
            written.latest_csv.display(),
            written.history_json.display()
        );
    }
    Ok(())
}

fn render_summary(report: &BenchReport) -> String {
    let mut out = format!(
        "{:<16} {:>6} {:>14} {:>14} {:>14} {:>14}\n",
        "strategy", "runs", "mean", "median", "p95", "std_dev"
    );
    for timings in &report.timings {
        let s = timings.summary();
        out.push_str(&format!(
            "{:<16} {:>6} {:>14} {:>14} {:>14} {:>14}\n",
            timings.strategy.key(),
            s.runs,
            format_ns(s.mean_ns),
            format_ns(s.median_ns),
            format_ns(s.p95_ns),
            format_ns(s.std_dev_ns)
        ));
    }
    out
}

fn diffs(source: SourceArgs, strategy: Strategy) -> anyhow::Result<()> {
    let cfg = resolve_config(&source)?;
    let dataset = Dataset::load(&cfg.fixture_path())?;
    let diffs = strategy.run(&dataset, &cfg.aggregate_options())?;

    let named: BTreeMap<&str, BTreeMap<&str, f64>> = diffs
        .iter()
        .map(|(case, values)| (case.as_str(), VARIABLES.iter().copied().zip(values.iter().copied()).collect()))
        .collect();
    println!("{}", serde_json::to_string_pretty(&named)?);
    Ok(())
}

fn generate(output: &Path, cases: usize, repetitions: usize) -> anyhow::Result<()> {
    let dataset = fixture::synthesize(cases, repetitions);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    }
    dataset.save(output)?;
    println!("Wrote {} observations to {}", dataset.len(), output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let CliArgs { command } = CliArgs::parse();

    match command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(args),
        Commands::Diffs { source, strategy } => diffs(source, strategy),
        Commands::Generate {
            output,
            cases,
            repetitions,
        } => generate(&output, cases, repetitions),
    }
}
