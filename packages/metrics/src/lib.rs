#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-scale landscape metrics over vector parcel layers.
//!
//! For every configured buffer distance the engine builds the parcel
//! neighborhood relation, reduces it to per-parcel Shannon diversity
//! (SHDI), Shannon evenness (SHEI) and landscape expansion (LEI), and
//! finally labels each parcel with an urban growth type from the LEI at
//! the canonical distance.
//!
//! The pipeline is driven by an explicit [`config::MetricsConfig`]; no
//! process-wide state is read.

pub mod assemble;
pub mod classifier;
pub mod config;
pub mod diversity;
pub mod engine;
pub mod expansion;
pub mod growth;
pub mod progress;

use thiserror::Error;

pub use config::{ConfigError, MetricsConfig};
pub use engine::{Diagnostics, ScenarioMetrics, compute};

/// Errors that can occur while computing scenario metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Neighborhood construction failed.
    #[error("Spatial error: {0}")]
    Spatial(#[from] vector_metrics_spatial::SpatialError),

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A metric column was requested for a distance that was never
    /// computed.
    #[error("No metrics computed for distance {distance} m")]
    MissingDistance {
        /// The requested distance.
        distance: f64,
    },
}

/// Replaces a non-finite value with zero, counting the replacement.
pub(crate) fn finite_or_zero(value: f64, coerced: &mut usize) -> f64 {
    if value.is_finite() {
        value
    } else {
        *coerced += 1;
        0.0
    }
}
