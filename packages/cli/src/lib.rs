#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scenario driver for the vector metrics toolchain.
//!
//! Runs load -> compute -> write for each configured scenario. Failures
//! are scoped to their scenario: a missing layer or a write error in one
//! scenario is logged and the next scenario still runs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use vector_metrics::progress::ProgressCallback;
use vector_metrics::{Diagnostics, MetricsConfig, MetricsError};
use vector_metrics_layer::LayerError;

/// Errors that abort a single scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Reading the input layer or writing an output failed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Computing the metrics failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Outcome of a successfully processed scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Number of parcels processed.
    pub parcels: usize,
    /// Counters collected by the engine.
    pub diagnostics: Diagnostics,
    /// Files written.
    pub outputs: Vec<PathBuf>,
    /// Wall-clock time of the scenario.
    pub elapsed: Duration,
}

/// Result of every scenario of a run, in configured order.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Scenarios that completed.
    pub succeeded: Vec<ScenarioReport>,
    /// Scenarios that failed, with their error.
    pub failed: Vec<(String, ScenarioError)>,
}

impl RunSummary {
    /// Whether every scenario completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Loads, computes and writes one scenario.
///
/// # Errors
///
/// Returns an error if the input layer cannot be loaded, the metrics
/// cannot be computed, or an output cannot be written.
pub fn run_scenario(
    config: &MetricsConfig,
    scenario: &str,
    progress: &dyn ProgressCallback,
) -> Result<ScenarioReport, ScenarioError> {
    let start = Instant::now();
    log::info!("Processing scenario {scenario}...");

    let mut parcels = vector_metrics_layer::read_parcels(&config.input_path(scenario), config)?;
    let metrics = vector_metrics::compute(&mut parcels, config, progress)?;
    let outputs = vector_metrics_layer::write_outputs(config, scenario, &parcels, &metrics)?;

    let elapsed = start.elapsed();
    log::info!(
        "Scenario {scenario}: {} parcels, {} invalid geometries, {} values coerced, {} failed distances in {:.2} minutes",
        parcels.len(),
        metrics.diagnostics.invalid_geometries,
        metrics.diagnostics.coerced_values,
        metrics.diagnostics.failed_distances.len(),
        elapsed.as_secs_f64() / 60.0
    );

    Ok(ScenarioReport {
        scenario: scenario.to_string(),
        parcels: parcels.len(),
        diagnostics: metrics.diagnostics,
        outputs,
        elapsed,
    })
}

/// Runs every configured scenario, isolating failures.
///
/// `scenario_progress` creates the per-scenario progress reporter;
/// `overall` advances once per scenario.
///
/// # Errors
///
/// Returns an error only if `config` fails validation. Scenario failures
/// are collected in the returned [`RunSummary`].
pub fn run<F>(
    config: &MetricsConfig,
    overall: &dyn ProgressCallback,
    scenario_progress: F,
) -> Result<RunSummary, MetricsError>
where
    F: Fn(&str) -> Arc<dyn ProgressCallback>,
{
    config.validate()?;

    let start = Instant::now();
    let mut summary = RunSummary::default();
    overall.set_total(config.scenarios.len() as u64);

    for scenario in &config.scenarios {
        overall.set_message(scenario.clone());
        let progress = scenario_progress(scenario);

        match run_scenario(config, scenario, progress.as_ref()) {
            Ok(report) => summary.succeeded.push(report),
            Err(e) => {
                progress.finish_and_clear();
                log::error!("Scenario {scenario} failed: {e}");
                summary.failed.push((scenario.clone(), e));
            }
        }

        overall.inc(1);
    }

    overall.finish(format!(
        "{} of {} scenarios completed",
        summary.succeeded.len(),
        config.scenarios.len()
    ));
    log::info!(
        "Process time: {:.2} minutes",
        start.elapsed().as_secs_f64() / 60.0
    );

    Ok(summary)
}
