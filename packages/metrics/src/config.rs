//! Pipeline configuration.
//!
//! [`MetricsConfig`] is deserialized from an optional TOML file, then
//! overridden from the command line, then validated once before any
//! scenario runs. Every field has a default matching the canonical
//! study setup, so an empty file is a valid configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vector_metrics_parcel_models::format_distance;

/// Canonical buffer radii in meters.
pub const DEFAULT_DISTANCES: &[f64] = &[
    25.0, 50.0, 75.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0,
];

/// Attributes every input feature must carry.
pub const DEFAULT_REQUIRED_ATTRIBUTES: &[&str] = &[
    "ID",
    "REFCAT",
    "USE_2018",
    "SIM_USE",
    "AREA",
    "ITERATION",
    "CLC_2018",
    "SIOSE_2014",
];

/// Errors raised while loading or validating a [`MetricsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// No buffer distance configured.
    #[error("At least one distance must be configured")]
    NoDistances,

    /// A distance is not finite and strictly positive.
    #[error("Invalid distance {distance}: must be finite and > 0")]
    InvalidDistance {
        /// The rejected distance.
        distance: f64,
    },

    /// The same distance appears twice, which would duplicate columns.
    #[error("Distance {distance} is configured more than once")]
    DuplicateDistance {
        /// The repeated distance.
        distance: f64,
    },

    /// Growth classification needs LEI at a distance that is not computed.
    #[error("Growth distance {distance} is not one of the configured distances")]
    GrowthDistanceNotConfigured {
        /// The configured growth distance.
        distance: f64,
    },

    /// The infilling threshold is not a finite number.
    #[error("Invalid growth threshold {threshold}")]
    InvalidThreshold {
        /// The rejected threshold.
        threshold: f64,
    },

    /// No scenario to process.
    #[error("At least one scenario must be configured")]
    NoScenarios,
}

/// Explicit configuration for a metrics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Directory inputs are read from and outputs are written under.
    pub working_dir: PathBuf,
    /// Sub-directory of `working_dir` receiving the outputs.
    pub output_dir: String,
    /// Scenario names; each maps to `<working_dir>/<scenario>.geojson`.
    pub scenarios: Vec<String>,
    /// Buffer radii in meters, in column order.
    pub distances: Vec<f64>,
    /// Parcel identifier attribute.
    pub id_attr: String,
    /// Authoritative parcel area attribute.
    pub area_attr: String,
    /// Simulation iteration attribute.
    pub iteration_attr: String,
    /// Simulated land-use attribute (diversity classes).
    pub sim_use_attr: String,
    /// Reference land-use attribute (urban/rural).
    pub ref_use_attr: String,
    /// Reference land use that marks a rural parcel.
    pub vacant_token: String,
    /// Attributes that must be present on every input feature.
    pub required_attributes: Vec<String>,
    /// Distance whose LEI drives growth classification.
    pub growth_distance: f64,
    /// LEI strictly above this value is infilling.
    pub growth_threshold: f64,
    /// Keep writing the remaining outputs after one output fails.
    pub partial_output: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            output_dir: "new".to_string(),
            scenarios: vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            distances: DEFAULT_DISTANCES.to_vec(),
            id_attr: "ID".to_string(),
            area_attr: "AREA".to_string(),
            iteration_attr: "ITERATION".to_string(),
            sim_use_attr: "SIM_USE".to_string(),
            ref_use_attr: "USE_2018".to_string(),
            vacant_token: "vacant".to_string(),
            required_attributes: DEFAULT_REQUIRED_ATTRIBUTES
                .iter()
                .map(ToString::to_string)
                .collect(),
            growth_distance: 50.0,
            growth_threshold: 0.5,
            partial_output: false,
        }
    }
}

impl MetricsConfig {
    /// Parses a configuration from TOML. Missing keys take their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(content)?)
    }

    /// Reads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.distances.is_empty() {
            return Err(ConfigError::NoDistances);
        }

        let mut seen = BTreeSet::new();
        for &distance in &self.distances {
            if !distance.is_finite() || distance <= 0.0 {
                return Err(ConfigError::InvalidDistance { distance });
            }
            if !seen.insert(format_distance(distance)) {
                return Err(ConfigError::DuplicateDistance { distance });
            }
        }

        if self.growth_distance_index().is_none() {
            return Err(ConfigError::GrowthDistanceNotConfigured {
                distance: self.growth_distance,
            });
        }

        if !self.growth_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.growth_threshold,
            });
        }

        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }

        Ok(())
    }

    /// Position of the growth distance within [`Self::distances`].
    #[must_use]
    pub fn growth_distance_index(&self) -> Option<usize> {
        let wanted = format_distance(self.growth_distance);
        self.distances
            .iter()
            .position(|&d| format_distance(d) == wanted)
    }

    /// Attributes to check on every feature: the configured required
    /// list plus every attribute the engine reads, without repeats.
    #[must_use]
    pub fn schema_attributes(&self) -> Vec<&str> {
        let mut attributes: Vec<&str> = Vec::new();
        let engine_attrs = [
            self.id_attr.as_str(),
            self.area_attr.as_str(),
            self.sim_use_attr.as_str(),
            self.ref_use_attr.as_str(),
            self.iteration_attr.as_str(),
        ];
        for attr in self
            .required_attributes
            .iter()
            .map(String::as_str)
            .chain(engine_attrs)
        {
            if !attributes.contains(&attr) {
                attributes.push(attr);
            }
        }
        attributes
    }

    /// Input layer path of a scenario.
    #[must_use]
    pub fn input_path(&self, scenario: &str) -> PathBuf {
        self.working_dir.join(format!("{scenario}.geojson"))
    }

    /// Directory receiving the outputs.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.working_dir.join(&self.output_dir)
    }
}
