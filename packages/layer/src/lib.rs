#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel layer I/O.
//!
//! Reads a scenario's `GeoJSON` `FeatureCollection` into [`Parcel`]s and
//! writes the enriched result back out as a `GeoJSON` polygon layer and a
//! CSV table. Source attributes pass through untouched; metric columns
//! and `GROWTH` are appended.
//!
//! [`Parcel`]: vector_metrics_parcel_models::Parcel

pub mod load;
pub mod write;

use std::path::PathBuf;

use thiserror::Error;

pub use load::{parse_parcels, read_parcels};
pub use write::{write_csv, write_geojson, write_outputs};

/// Errors that can occur while reading or writing parcel layers.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The scenario layer is absent or unreadable.
    #[error("Cannot read input layer {path}: {source}")]
    InputMissing {
        /// Path of the input layer.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The input is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Input layer is not a FeatureCollection")]
    NotAFeatureCollection,

    /// A required attribute is absent from a feature.
    #[error("Feature {feature} is missing required attribute '{attribute}'")]
    SchemaMismatch {
        /// Missing attribute name.
        attribute: String,
        /// Zero-based feature position.
        feature: usize,
    },

    /// An attribute is present but unusable.
    #[error("Feature {feature} has invalid '{attribute}': {message}")]
    InvalidAttribute {
        /// Attribute name.
        attribute: String,
        /// Zero-based feature position.
        feature: usize,
        /// What is wrong with the value.
        message: String,
    },

    /// Two features share the same parcel identifier.
    #[error("Duplicate parcel ID '{id}'")]
    DuplicateId {
        /// The repeated identifier.
        id: String,
    },

    /// A feature has no polygonal geometry.
    #[error("Feature {feature} has unusable geometry: {message}")]
    InvalidGeometry {
        /// Zero-based feature position.
        feature: usize,
        /// What is wrong with the geometry.
        message: String,
    },

    /// An output could not be persisted.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path of the output.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

