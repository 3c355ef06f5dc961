#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the vector metrics toolchain.
//!
//! Resolves the configuration (defaults, then an optional TOML file,
//! then command line overrides), validates it, and processes every
//! scenario. Exits nonzero when any scenario fails.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vector_metrics::MetricsConfig;
use vector_metrics_cli_utils::IndicatifProgress;

#[derive(Parser)]
#[command(
    name = "vector_metrics",
    about = "Multi-scale SHDI, SHEI and LEI metrics for parcel layers"
)]
struct Cli {
    /// TOML configuration file. Missing keys take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics for every configured scenario (default)
    Run(Overrides),
    /// Print the resolved configuration as TOML
    Config(Overrides),
}

/// Command line overrides applied on top of the configuration file.
#[derive(Args, Default)]
struct Overrides {
    /// Directory holding `<scenario>.geojson` inputs
    #[arg(long)]
    working_dir: Option<PathBuf>,
    /// Comma-separated list of scenario names (e.g., "s1,s2")
    #[arg(long)]
    scenarios: Option<String>,
    /// Comma-separated list of buffer distances in meters (e.g., "25,50,100")
    #[arg(long)]
    distances: Option<String>,
    /// Distance whose LEI drives growth classification
    #[arg(long)]
    growth_distance: Option<f64>,
    /// LEI strictly above this value is classified as infilling
    #[arg(long)]
    growth_threshold: Option<f64>,
    /// Keep writing the remaining outputs of a scenario after one fails
    #[arg(long)]
    partial_output: bool,
}

impl Overrides {
    fn apply(self, config: &mut MetricsConfig) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(working_dir) = self.working_dir {
            config.working_dir = working_dir;
        }
        if let Some(scenarios) = self.scenarios {
            config.scenarios = split_list(&scenarios).map(ToString::to_string).collect();
        }
        if let Some(distances) = self.distances {
            config.distances = split_list(&distances)
                .map(str::parse::<f64>)
                .collect::<Result<_, _>>()
                .map_err(|e| format!("Invalid --distances '{distances}': {e}"))?;
        }
        if let Some(growth_distance) = self.growth_distance {
            config.growth_distance = growth_distance;
        }
        if let Some(growth_threshold) = self.growth_threshold {
            config.growth_threshold = growth_threshold;
        }
        if self.partial_output {
            config.partial_output = true;
        }
        Ok(())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = vector_metrics_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MetricsConfig::load(path)?,
        None => MetricsConfig::default(),
    };

    let (overrides, print_only) = match cli.command {
        None => (Overrides::default(), false),
        Some(Commands::Run(overrides)) => (overrides, false),
        Some(Commands::Config(overrides)) => (overrides, true),
    };
    overrides.apply(&mut config)?;
    config.validate()?;

    if print_only {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let overall = IndicatifProgress::steps_bar(
        &multi,
        "Scenarios",
        config.scenarios.len() as u64,
    );
    let summary = vector_metrics_cli::run(&config, overall.as_ref(), |scenario| {
        IndicatifProgress::distances_bar(&multi, scenario)
    })?;

    for report in &summary.succeeded {
        for output in &report.outputs {
            println!("{}: {}", report.scenario, output.display());
        }
    }

    if summary.is_success() {
        Ok(())
    } else {
        let failed: Vec<&str> = summary.failed.iter().map(|(s, _)| s.as_str()).collect();
        Err(format!(
            "{} of {} scenarios failed: {}",
            failed.len(),
            config.scenarios.len(),
            failed.join(", ")
        )
        .into())
    }
}
