//! Joins per-distance metric outcomes back onto the parcel table.
//!
//! Every distance yields three columns of length `n` (one value per
//! parcel row). Parcels missing from a reduction, and every parcel of a
//! distance whose computation failed, keep the value 0 so the output
//! schema does not depend on what succeeded.

use vector_metrics_parcel_models::MetricKind;

use crate::diversity::DiversityOutcome;
use crate::expansion::ExpansionOutcome;

/// SHDI, SHEI and LEI columns for one buffer distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceColumns {
    /// Buffer radius in meters.
    pub distance: f64,
    /// SHDI per parcel row.
    pub shdi: Vec<f64>,
    /// SHEI per parcel row.
    pub shei: Vec<f64>,
    /// LEI per parcel row.
    pub lei: Vec<f64>,
    /// Whether the columns were zero-filled after a failure.
    pub failed: bool,
}

impl DistanceColumns {
    fn zeroed(distance: f64, len: usize, failed: bool) -> Self {
        Self {
            distance,
            shdi: vec![0.0; len],
            shei: vec![0.0; len],
            lei: vec![0.0; len],
            failed,
        }
    }

    /// Values of `kind` per parcel row.
    #[must_use]
    pub fn values(&self, kind: MetricKind) -> &[f64] {
        match kind {
            MetricKind::Shdi => &self.shdi,
            MetricKind::Shei => &self.shei,
            MetricKind::Lei => &self.lei,
        }
    }
}

/// All metric columns of a scenario, in configured distance order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    len: usize,
    columns: Vec<DistanceColumns>,
}

impl MetricTable {
    /// Creates an empty table for `len` parcels.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self {
            len,
            columns: Vec::new(),
        }
    }

    /// Number of parcel rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no parcel rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends the columns of `distance` from its reductions.
    pub fn push_distance(
        &mut self,
        distance: f64,
        diversity: &DiversityOutcome,
        expansion: &ExpansionOutcome,
    ) {
        let mut columns = DistanceColumns::zeroed(distance, self.len, false);

        for (&row, metrics) in diversity.rows.range(..self.len) {
            columns.shdi[row] = metrics.shdi;
            columns.shei[row] = metrics.shei;
        }
        for (&row, &lei) in expansion.rows.range(..self.len) {
            columns.lei[row] = lei;
        }

        self.columns.push(columns);
    }

    /// Appends zero-filled columns for a distance that failed.
    pub fn push_failed(&mut self, distance: f64) {
        self.columns
            .push(DistanceColumns::zeroed(distance, self.len, true));
    }

    /// Per-distance columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[DistanceColumns] {
        &self.columns
    }

    /// Columns of a given distance, if it was computed.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn distance(&self, distance: f64) -> Option<&DistanceColumns> {
        self.columns.iter().find(|c| c.distance == distance)
    }

    /// Export column names, three per distance (`SHDI_d`, `SHEI_d`, `LEI_d`).
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| MetricKind::ALL.iter().map(|kind| kind.column(c.distance)))
            .collect()
    }

    /// `(column name, value)` pairs of one parcel row, in export order.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<(String, f64)> {
        self.columns
            .iter()
            .flat_map(|c| {
                MetricKind::ALL
                    .iter()
                    .map(move |&kind| (kind.column(c.distance), c.values(kind)[row]))
            })
            .collect()
    }
}
