//! tunekit CLI - resolve hyperparameters and manage trained models
//!
//! Subcommands map onto the stages of a training run:
//!
//! 1. `resolve` / `grid`: merge and coerce parameters, expand search spaces
//! 2. `algorithms`: list supported estimators and their schemas
//! 3. `data`: check how a dataset loads and splits
//! 4. `metrics`: score predictions against true labels
//! 5. `register`: record a run in the model registry and promote a version
//!
//! Design philosophy:
//! - Fail fast with clear error messages
//! - Warnings go to stderr, results to stdout
//! - Config file supplies defaults, flags win

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunekit::config::Config;
use tunekit::data::{self, Dataset};
use tunekit::params::{
    self, AlgorithmSpec, ParamMap, ParamSchema, ParamValue, ParameterResolver, ResolvedParameters,
};
use tunekit::registry::{self, ModelRegistry, RunRecord};
use tunekit::training::{ParameterGrid, eval_classification_metrics};

/// Hyperparameter resolution for ML training backends
///
/// Examples:
///   tunekit resolve -a lightgbm --params "num_leaves=63;learning_rate=0.05"
///   tunekit grid -a svm --search-params "C=[0.1, 1, 10];kernel=['rbf', 'linear']"
///   tunekit register --model-name churn --run-id 1f2e --metric accuracy=0.91
#[derive(Parser, Debug)]
#[command(name = "tunekit")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: tunekit.toml or pyproject.toml [tool.tunekit])
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge and coerce parameters for an algorithm
    Resolve {
        #[command(flatten)]
        params: ParamArgs,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Expand the search space into candidate parameter sets
    Grid {
        #[command(flatten)]
        params: ParamArgs,

        /// Print at most this many candidates
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List supported algorithms, or show one schema
    Algorithms {
        /// Algorithm name or alias
        name: Option<String>,
    },

    /// Load a dataset and report the train/test split
    Data {
        /// csv file, or directory holding train.csv and test.csv
        path: PathBuf,

        #[arg(long)]
        label_column: Option<String>,

        #[arg(long)]
        test_size: Option<f64>,

        #[arg(long)]
        random_state: Option<u64>,
    },

    /// Score predictions against true labels
    Metrics {
        /// csv file holding both label columns
        #[arg(long)]
        predictions: PathBuf,

        /// Column of true labels (default: configured label column)
        #[arg(long)]
        true_column: Option<String>,

        #[arg(long, default_value = "prediction")]
        pred_column: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Register a run as a new model version
    Register {
        #[arg(long)]
        model_name: String,

        /// Run to register; omit to only archive the production version
        #[arg(long)]
        run_id: Option<String>,

        /// Artifact location (default: runs:/<run-id>/artifact)
        #[arg(long)]
        source: Option<String>,

        /// Run metric as NAME=VALUE (repeatable)
        #[arg(long = "metric", value_name = "NAME=VALUE")]
        metrics: Vec<String>,

        /// JSON object of run metrics
        #[arg(long)]
        metrics_file: Option<PathBuf>,

        /// Promote the version maximising this metric
        #[arg(long)]
        key_metric: Option<String>,

        /// Registry directory
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// Algorithm name or alias
    #[arg(short, long, required_unless_present = "signature_file")]
    algorithm: Option<String>,

    /// JSON constructor signature (`params`, `defaults`) used as schema
    #[arg(long, conflicts_with = "algorithm")]
    signature_file: Option<PathBuf>,

    /// JSON object of parameters
    #[arg(long)]
    param_file: Option<PathBuf>,

    /// Parameters as "k=v;k=v"
    #[arg(long)]
    params: Option<String>,

    /// Search space as "k=[a, b];k=[c]"
    #[arg(long)]
    search_params: Option<String>,

    /// Override as KEY=JSON (repeatable, applied last)
    #[arg(long = "set", value_name = "KEY=JSON")]
    overrides: Vec<String>,
}

impl ParamArgs {
    fn spec(&self) -> Result<AlgorithmSpec> {
        if let Some(ref path) = self.signature_file {
            let schema = ParamSchema::from_signature_file(path)?;
            return Ok(AlgorithmSpec::new("custom", &path.display().to_string()).with_schema(schema));
        }
        match self.algorithm {
            Some(ref name) => Ok(params::algorithm(name)?),
            None => bail!("either --algorithm or --signature-file is required"),
        }
    }

    fn resolve(&self) -> Result<ResolvedParameters> {
        let spec = self.spec()?;
        let mut resolver = ParameterResolver::new(&spec).overrides(parse_overrides(&self.overrides)?);
        if let Some(ref path) = self.param_file {
            resolver = resolver.param_file(path);
        }
        if let Some(ref params) = self.params {
            resolver = resolver.params(params.as_str());
        }
        if let Some(ref search) = self.search_params {
            resolver = resolver.search_params(search.as_str());
        }
        Ok(resolver.resolve()?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config {
        Some(ref path) => Config::load_file(path)?,
        None => Config::load(&std::env::current_dir()?),
    };
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }

    match cli.command {
        Command::Resolve { params, json } => run_resolve(&params, json),
        Command::Grid { params, limit } => run_grid(&params, limit),
        Command::Algorithms { name } => run_algorithms(name.as_deref()),
        Command::Data {
            path,
            label_column,
            test_size,
            random_state,
        } => run_data(
            &path,
            label_column.as_deref().unwrap_or(&config.label_column),
            test_size.unwrap_or(config.test_size),
            random_state.unwrap_or(config.random_state),
        ),
        Command::Metrics {
            predictions,
            true_column,
            pred_column,
            json,
        } => run_metrics(
            &predictions,
            true_column.as_deref().unwrap_or(&config.label_column),
            &pred_column,
            json,
        ),
        Command::Register {
            model_name,
            run_id,
            source,
            metrics,
            metrics_file,
            key_metric,
            registry,
        } => {
            let mut run_metrics = match metrics_file {
                Some(ref path) => load_metrics_file(path)?,
                None => BTreeMap::new(),
            };
            run_metrics.extend(parse_metrics(&metrics)?);
            let run = run_id.map(|run_id| RunRecord {
                run_id,
                source,
                metrics: run_metrics,
            });
            run_register(
                registry.as_deref().unwrap_or(&config.registry),
                &model_name,
                run.as_ref(),
                key_metric.as_deref().or(config.key_metric.as_deref()),
            )
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tunekit=debug" } else { "tunekit=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn run_resolve(args: &ParamArgs, json: bool) -> Result<()> {
    let resolved = args.resolve()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        println!("{}", resolved);
    }
    report_warnings(&resolved);
    Ok(())
}

fn run_grid(args: &ParamArgs, limit: Option<usize>) -> Result<()> {
    let resolved = args.resolve()?;
    let grid = ParameterGrid::new(&resolved.search_params)?;
    let shown = limit.unwrap_or(usize::MAX).min(grid.len());

    eprintln!(
        "{} {} candidates over [{}]",
        "grid:".bold(),
        grid.len(),
        grid.param_names().join(", ")
    );
    for (i, candidate) in grid
        .candidates(&resolved.input_params)
        .into_iter()
        .take(shown)
        .enumerate()
    {
        println!("{:>4}  {}", i.dimmed(), candidate);
    }
    if shown < grid.len() {
        eprintln!("... ({} more)", grid.len() - shown);
    }
    report_warnings(&resolved);
    Ok(())
}

fn run_algorithms(name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        for spec in params::algorithms() {
            println!(
                "{:<12} {:<24} {} params",
                spec.name.bold(),
                spec.estimator,
                spec.schema.len()
            );
        }
        return Ok(());
    };

    let spec = params::algorithm(name)?;
    println!("{} ({})", spec.name.bold(), spec.estimator);
    print_schema(&spec);
    if !spec.overrides.is_empty() {
        println!("{} {}", "overrides:".dimmed(), spec.overrides);
    }
    Ok(())
}

fn print_schema(spec: &AlgorithmSpec) {
    if spec.schema.is_empty() {
        println!("   (no schema, fallback: {:?})", spec.fallback);
        return;
    }
    for (key, entry) in spec.schema.iter() {
        let parser = if spec.parsers.contains_key(key) { " [literal]" } else { "" };
        println!(
            "   {:<28} {:<6} {}{}",
            key,
            entry.kind.to_string().cyan(),
            entry.default,
            parser.dimmed()
        );
    }
}

fn run_data(path: &Path, label_column: &str, test_size: f64, random_state: u64) -> Result<()> {
    let split = data::load_data(path, label_column, test_size, random_state)?;
    println!("{} {} features", "features:".bold(), split.train.n_features());
    print_partition("train", &split.train);
    print_partition("test", &split.test);
    Ok(())
}

fn print_partition(name: &str, data: &Dataset) {
    let counts: Vec<String> = data
        .label_counts()
        .into_iter()
        .map(|(label, n)| format!("{}={}", label, n))
        .collect();
    println!("{:>6}: {} rows  ({})", name.bold(), data.len(), counts.join(", "));
}

fn run_metrics(path: &Path, true_column: &str, pred_column: &str, json: bool) -> Result<()> {
    let columns = data::load_columns(path, &[true_column, pred_column])?;
    let metrics = eval_classification_metrics(&columns[0], &columns[1])?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        for (name, value) in metrics.to_map() {
            println!("{:<10} {:.4}", name, value);
        }
    }
    Ok(())
}

fn run_register(
    root: &Path,
    model_name: &str,
    run: Option<&RunRecord>,
    key_metric: Option<&str>,
) -> Result<()> {
    let mut registry = ModelRegistry::open(root)?;
    let promoted = registry::create_model_version(&mut registry, model_name, run, key_metric)?;
    registry.save()?;
    tracing::debug!("registry saved to {}", registry.path().display());

    match promoted {
        Some(version) => println!(
            "{} {} version {} is in Production",
            "✓".green(),
            model_name,
            version
        ),
        None => println!("{} {} has no Production version", "!".yellow(), model_name),
    }
    Ok(())
}

fn report_warnings(resolved: &ResolvedParameters) {
    if !resolved.warnings.is_empty() {
        eprintln!(
            "{} {} warning(s) while resolving parameters",
            "⚠".yellow(),
            resolved.warnings.len()
        );
    }
}

/// Parse `KEY=JSON` overrides; values that are not JSON stay strings.
fn parse_overrides(entries: &[String]) -> Result<ParamMap> {
    let mut overrides = ParamMap::new();
    for entry in entries {
        let Some((key, raw)) = entry.split_once('=') else {
            bail!("override '{}' must look like KEY=VALUE", entry);
        };
        let value = match serde_json::from_str::<serde_json::Value>(raw.trim()) {
            Ok(json) => ParamValue::from(json),
            Err(_) => ParamValue::Str(raw.trim().to_string()),
        };
        overrides.insert(key.trim(), value);
    }
    Ok(overrides)
}

fn parse_metrics(entries: &[String]) -> Result<BTreeMap<String, f64>> {
    let mut metrics = BTreeMap::new();
    for entry in entries {
        let Some((name, raw)) = entry.split_once('=') else {
            bail!("metric '{}' must look like NAME=VALUE", entry);
        };
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("metric '{}' is not a number", name.trim()))?;
        metrics.insert(name.trim().to_string(), value);
    }
    Ok(metrics)
}

fn load_metrics_file(path: &Path) -> Result<BTreeMap<String, f64>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
