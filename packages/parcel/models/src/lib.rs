#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel data model for the vector metrics toolchain.
//!
//! A [`Parcel`] is one cadastral polygon with its reference-epoch and
//! simulated-epoch land uses. Everything downstream (neighborhood
//! building, diversity and expansion metrics, growth classification)
//! reads from these types and never mutates geometry.

use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Simulated-use value that marks a vacant parcel. Contributes area to a
/// neighborhood but never a term to its diversity sum.
pub const VACANT_CLASS: &str = "";

/// Iteration value of a parcel the simulation left unchanged.
pub const UNCHANGED_ITERATION: &str = "0";

/// Name of the growth column in exported layers.
pub const GROWTH_COLUMN: &str = "GROWTH";

/// Stable parcel identifier, unique within a scenario.
///
/// Integer identifiers from the source layer are stored in their decimal
/// string form so that both kinds compare and hash the same way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(pub String);

impl ParcelId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParcelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Urban/rural label derived from the reference land use.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum LandType {
    /// Any reference use other than the vacant token. Also the label of a
    /// parcel whose reference use is missing.
    #[default]
    #[serde(rename = "U")]
    #[strum(serialize = "U")]
    Urban,
    /// Reference use equal to the vacant token.
    #[serde(rename = "R")]
    #[strum(serialize = "R")]
    Rural,
}

/// Urban growth morphology at the canonical scale.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Growth {
    /// The parcel did not change during the simulation.
    #[serde(rename = "No growth")]
    #[strum(serialize = "No growth")]
    NoGrowth,
    /// Changed parcel with no urban area in its neighborhood.
    #[serde(rename = "Outlying")]
    #[strum(serialize = "Outlying")]
    Outlying,
    /// Changed parcel with some, but not most, urban neighborhood area.
    #[serde(rename = "Edge expansion")]
    #[strum(serialize = "Edge expansion")]
    EdgeExpansion,
    /// Changed parcel whose neighborhood is mostly urban.
    #[serde(rename = "Infilling")]
    #[strum(serialize = "Infilling")]
    Infilling,
}

impl Growth {
    /// All growth categories, in classification order.
    pub const ALL: &[Self] = &[
        Self::NoGrowth,
        Self::Outlying,
        Self::EdgeExpansion,
        Self::Infilling,
    ];
}

/// Per-distance metric computed for every parcel.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    /// Shannon Diversity Index.
    Shdi,
    /// Shannon Evenness Index.
    Shei,
    /// Landscape Expansion Index.
    Lei,
}

impl MetricKind {
    /// Metrics in export column order.
    pub const ALL: &[Self] = &[Self::Shdi, Self::Shei, Self::Lei];

    /// Column name for this metric at `distance` (e.g. `"LEI_50"`).
    #[must_use]
    pub fn column(self, distance: f64) -> String {
        format!("{}_{}", self.as_ref(), format_distance(distance))
    }
}

/// Formats a buffer distance for use in a column name.
///
/// Integral distances drop the fractional part (`50.0` -> `"50"`); other
/// values use their shortest decimal representation (`12.5` -> `"12.5"`).
#[must_use]
pub fn format_distance(distance: f64) -> String {
    if distance.fract() == 0.0 && distance.abs() < 1e15 {
        format!("{distance:.0}")
    } else {
        distance.to_string()
    }
}

/// One cadastral parcel of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    /// Identifier, unique within the scenario.
    pub id: ParcelId,
    /// Polygon geometry in a planar metric CRS (EPSG:25830).
    pub geometry: MultiPolygon<f64>,
    /// Authoritative planar area in square meters. Not recomputed from
    /// [`Self::geometry`].
    pub area: f64,
    /// Reference-epoch land use. `None` when the attribute is null.
    pub ref_use: Option<String>,
    /// Simulated-epoch land use; [`VACANT_CLASS`] for vacant parcels.
    pub sim_use: String,
    /// Simulation iteration that changed the parcel. `None` when null,
    /// which reads the same as [`UNCHANGED_ITERATION`].
    pub iteration: Option<String>,
    /// Derived urban/rural label. Populated by the classifier.
    pub land_type: LandType,
    /// Every source attribute, passed through untouched to the outputs.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Parcel {
    /// Whether the simulation left this parcel unchanged.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.iteration
            .as_deref()
            .is_none_or(|iteration| iteration == UNCHANGED_ITERATION)
    }
}
