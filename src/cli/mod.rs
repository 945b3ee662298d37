//! Engine maintenance CLI module
//!
//! Command-line front end wiring the resolver, preparation, training and
//! inference stages together.

use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifacts::{Artifact, ArtifactResolver, ArtifactSource, LocalCache, RemoteOutcome};
use crate::config::Settings;
use crate::inference::{InferenceConfig, InferenceEngine};
use crate::optimizer::SearchSpace;
use crate::preprocessing::{run_preparation, FEATURE_COLUMNS, FEATURE_SCHEMA, TARGET_COLUMN};
use crate::training::run_training_with;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn remote_line(remote: &RemoteOutcome) -> String {
    match remote {
        RemoteOutcome::Stored { location } => format!("{} {}", ok("stored"), location),
        RemoteOutcome::NotConfigured => dim("not configured").to_string(),
        RemoteOutcome::Failed { reason } => format!("{} {}", "failed".yellow(), reason),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "engine-maintenance")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predictive maintenance for engines: prepare, train, predict")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy a raw engine CSV into the local cache and upload it to the dataset repository
    RegisterData {
        /// Raw engine data file (CSV)
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Clean, deduplicate, impute and split the raw dataset
    Prepare,

    /// Tune, evaluate and publish the maintenance classifier
    Train {
        /// Search space as JSON (defaults to the built-in random forest grid)
        #[arg(short, long)]
        search_space: Option<PathBuf>,

        /// Number of sampled configurations
        #[arg(long)]
        iterations: Option<usize>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,
    },

    /// Predict the engine condition for one reading
    Predict {
        /// Feature value as NAME=VALUE (repeatable)
        #[arg(short = 'f', long = "feature", value_name = "NAME=VALUE")]
        features: Vec<String>,

        /// JSON object of feature values
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Model source (auto, local, remote)
        #[arg(short, long, default_value = "auto")]
        source: String,
    },

    /// Show the feature schema
    Schema,
}

/// Dispatch a parsed command
pub fn run(cli: Cli, settings: &Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::RegisterData { path } => cmd_register_data(settings, &path),
        Commands::Prepare => cmd_prepare(settings),
        Commands::Train { search_space, iterations, cv_folds } => {
            let settings = settings.clone().with_search(
                iterations.unwrap_or(settings.search_iterations),
                cv_folds.unwrap_or(settings.cv_folds),
            );
            settings.validate()?;
            cmd_train(&settings, search_space.as_deref())
        }
        Commands::Predict { features, input, source } => {
            cmd_predict(settings, &features, input.as_deref(), &source)
        }
        Commands::Schema => {
            cmd_schema();
            Ok(())
        }
    }
}

// ─── Input parsing ─────────────────────────────────────────────────────────────

/// Parse `NAME=VALUE` pairs into a feature map
pub fn parse_feature_args(args: &[String]) -> anyhow::Result<HashMap<String, f64>> {
    let mut map = HashMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected NAME=VALUE, got '{}'", arg))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value for {}: '{}'", name, value))?;
        if !value.is_finite() {
            anyhow::bail!("value for {} must be finite, got {}", name, value);
        }
        map.insert(name.trim().to_string(), value);
    }
    Ok(map)
}

fn load_feature_json(path: &Path) -> anyhow::Result<HashMap<String, f64>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_register_data(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    section("Register data");

    let resolver = ArtifactResolver::new(settings)?;
    let local = resolver.local_path(Artifact::RawDataset);

    step_run(&format!("Caching → {}", local.display()));
    LocalCache::write_file(&local, &std::fs::read(path)?)?;
    step_done("");

    if resolver.has_remote(Artifact::RawDataset) {
        step_run("Uploading to dataset repository");
        let location = resolver.register(&local, Artifact::RawDataset)?;
        step_done(&location);
    } else {
        println!("  {} {}", "!".yellow(), muted("no dataset repository or token configured, kept locally"));
    }

    println!();
    Ok(())
}

pub fn cmd_prepare(settings: &Settings) -> anyhow::Result<()> {
    section("Prepare");

    let resolver = ArtifactResolver::new(settings)?;
    step_run("Cleaning and splitting");
    let start = Instant::now();
    let outcome = run_preparation(settings, &resolver)?;
    step_done(&format!("{:?}", start.elapsed()));

    let report = &outcome.report;
    println!();
    kv("Raw rows", &report.raw_rows.to_string());
    kv("Duplicates removed", &report.duplicates_removed.to_string());
    for (column, count) in &report.imputed {
        kv(&format!("Imputed {}", column), &count.to_string());
    }
    if !report.dropped_columns.is_empty() {
        kv("Dropped columns", &report.dropped_columns.join(", "));
    }
    kv("Train rows", &report.train_rows.to_string());
    kv("Test rows", &report.test_rows.to_string());
    kv("Positive rate", &format!("{:.4}", report.positive_rate));
    kv("Train split", &remote_line(&outcome.train.remote));
    kv("Test split", &remote_line(&outcome.test.remote));
    println!();

    Ok(())
}

pub fn cmd_train(settings: &Settings, search_space: Option<&Path>) -> anyhow::Result<()> {
    section("Train");

    let space = match search_space {
        Some(path) => SearchSpace::from_json_file(path)?,
        None => SearchSpace::random_forest_default(),
    };

    let resolver = ArtifactResolver::new(settings)?;
    step_run(&format!(
        "Searching {} configurations × {} folds",
        settings.search_iterations.to_string().cyan(),
        settings.cv_folds
    ));
    let start = Instant::now();
    let outcome = run_training_with(settings, &resolver, &space)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {}", "Best configuration".white().bold());
    for (name, value) in &outcome.best_params {
        kv(name, &value.to_string());
    }
    kv("Mean CV F1", &format!("{:.4}", outcome.search.best_score));

    println!();
    println!("  {}", "Test metrics".white().bold());
    for (name, value) in outcome.metrics.as_pairs() {
        kv(name, &format!("{:.4}", value));
    }

    println!();
    kv("Model", &outcome.artifact.local_path.display().to_string());
    kv("Remote", &remote_line(&outcome.artifact.remote));
    if let Some(run_id) = &outcome.run_id {
        kv("Run", run_id);
    }
    println!();

    Ok(())
}

pub fn cmd_predict(
    settings: &Settings,
    feature_args: &[String],
    input: Option<&Path>,
    source: &str,
) -> anyhow::Result<()> {
    let mut features = match input {
        Some(path) => load_feature_json(path)?,
        None => HashMap::new(),
    };
    features.extend(parse_feature_args(feature_args)?);
    let source: ArtifactSource = source.parse()?;

    section("Predict");

    let engine = InferenceEngine::new(settings, InferenceConfig::default())?;
    let prediction = engine.predict(&features, Some(source))?;

    for name in FEATURE_COLUMNS.iter() {
        let shown = match features.get(*name) {
            Some(value) => value.to_string(),
            None => dim("0 (missing)").to_string(),
        };
        kv(name, &shown);
    }
    println!();

    let verdict = if prediction.requires_maintenance() {
        "requires maintenance".red().bold()
    } else {
        "normal".green().bold()
    };
    kv(TARGET_COLUMN, &format!("{} {}", prediction.label, verdict));
    kv("Probability", &format!("{:.4}", prediction.probability));
    println!();

    Ok(())
}

pub fn cmd_schema() {
    section("Feature schema");
    println!(
        "  {:<22} {:>6} {:>10} {:>10}  {}",
        muted("Feature"),
        muted("Unit"),
        muted("Min"),
        muted("Max"),
        muted("Description")
    );
    for spec in FEATURE_SCHEMA.iter() {
        println!(
            "  {:<22} {:>6} {:>10} {:>10}  {}",
            spec.name.white(),
            spec.unit,
            spec.min,
            spec.max,
            dim(spec.description)
        );
    }
    println!();
    println!("  {} {} {}", muted("Target"), TARGET_COLUMN.white(), dim("(0 = normal, 1 = requires maintenance)"));
    println!();
}
