#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for parcel neighborhoods.
//!
//! Indexes every valid parcel polygon in an R-tree once per scenario and
//! answers, for a buffer radius `d`, which parcels intersect each
//! parcel's buffer. The join is boundary-inclusive: a neighbor that only
//! touches the buffer counts. Candidates are pruned by envelope overlap
//! before the exact predicate runs.

use geo::{BoundingRect, Buffer, Intersects, MultiPolygon, Validation};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;
use vector_metrics_parcel_models::{LandType, Parcel};

/// Errors that can occur while building neighborhoods.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The buffer radius is not a finite, strictly positive number.
    #[error("Invalid buffer distance {distance}: must be finite and > 0")]
    InvalidDistance {
        /// The rejected distance.
        distance: f64,
    },
}

/// A parcel envelope stored in the R-tree, pointing back into the
/// parcel slice the index was built from.
struct ParcelEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ParcelEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// One `(focal, neighbor)` pair of a neighborhood relation.
///
/// The attribute fields describe the neighbor, never the focal parcel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborRecord<'a> {
    /// Row of the focal parcel in the indexed slice.
    pub focal: usize,
    /// Row of the neighbor in the indexed slice.
    pub neighbor: usize,
    /// Neighbor's authoritative area.
    pub area: f64,
    /// Neighbor's simulated use.
    pub sim_use: &'a str,
    /// Neighbor's urban/rural label.
    pub land_type: LandType,
}

/// The neighborhood relation `N_d` for one buffer distance.
#[derive(Debug, Clone)]
pub struct Neighborhood<'a> {
    /// Buffer radius in meters.
    pub distance: f64,
    /// Pairs ordered by `(focal, neighbor)`, without duplicates.
    pub records: Vec<NeighborRecord<'a>>,
    /// Focal parcels whose buffer came out empty and were left out.
    pub failed: Vec<usize>,
}

impl Neighborhood<'_> {
    /// Neighbor rows of `focal`, in ascending order.
    #[must_use]
    pub fn neighbors_of(&self, focal: usize) -> Vec<usize> {
        let start = self.records.partition_point(|r| r.focal < focal);
        self.records[start..]
            .iter()
            .take_while(|r| r.focal == focal)
            .map(|r| r.neighbor)
            .collect()
    }
}

/// Pre-built R-tree over the parcels of one scenario.
///
/// Constructed once and probed once per configured distance. Parcels
/// with invalid geometry are excluded both as focal parcels and as
/// neighbors, so their metrics fall back to zero downstream.
pub struct ParcelIndex {
    tree: RTree<ParcelEntry>,
    indexed: Vec<bool>,
    skipped: Vec<usize>,
}

impl ParcelIndex {
    /// Validates every parcel geometry and bulk-loads the valid ones.
    #[must_use]
    pub fn build(parcels: &[Parcel]) -> Self {
        let mut entries = Vec::with_capacity(parcels.len());
        let mut indexed = vec![false; parcels.len()];
        let mut skipped = Vec::new();

        for (index, parcel) in parcels.iter().enumerate() {
            if !parcel.geometry.is_valid() {
                log::warn!(
                    "Parcel {} has invalid geometry, excluding it from neighborhoods",
                    parcel.id
                );
                skipped.push(index);
                continue;
            }

            let Some(envelope) = compute_envelope(&parcel.geometry) else {
                log::warn!("Parcel {} has empty geometry, excluding it", parcel.id);
                skipped.push(index);
                continue;
            };

            indexed[index] = true;
            entries.push(ParcelEntry { index, envelope });
        }

        log::info!(
            "Loaded {} parcels into spatial index ({} excluded)",
            entries.len(),
            skipped.len()
        );

        Self {
            tree: RTree::bulk_load(entries),
            indexed,
            skipped,
        }
    }

    /// Rows excluded from the index because of invalid or empty geometry.
    #[must_use]
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Number of parcels present in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no parcel made it into the index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Builds `N_d`: every pair `(p, q)` such that `q` intersects the
    /// round buffer of `p` at radius `distance`.
    ///
    /// `parcels` must be the slice the index was built from.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidDistance`] if `distance` is not
    /// finite and strictly positive.
    pub fn neighborhood<'a>(
        &self,
        parcels: &'a [Parcel],
        distance: f64,
    ) -> Result<Neighborhood<'a>, SpatialError> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(SpatialError::InvalidDistance { distance });
        }

        let mut records = Vec::new();
        let mut failed = Vec::new();
        let mut candidates = Vec::new();

        for (focal, parcel) in parcels.iter().enumerate() {
            if !self.indexed.get(focal).copied().unwrap_or(false) {
                continue;
            }

            let buffer = parcel.geometry.buffer(distance);
            let Some(query_env) = compute_envelope(&buffer) else {
                log::warn!(
                    "Buffer of parcel {} at {distance} m is empty, skipping it",
                    parcel.id
                );
                failed.push(focal);
                continue;
            };

            candidates.clear();
            candidates.extend(
                self.tree
                    .locate_in_envelope_intersecting(&query_env)
                    .map(|entry| entry.index),
            );
            candidates.sort_unstable();

            for &neighbor in &candidates {
                let other = &parcels[neighbor];
                if buffer.intersects(&other.geometry) {
                    records.push(NeighborRecord {
                        focal,
                        neighbor,
                        area: other.area,
                        sim_use: &other.sim_use,
                        land_type: other.land_type,
                    });
                }
            }
        }

        log::debug!(
            "Built {} neighbor pairs at {distance} m ({} buffers failed)",
            records.len(),
            failed.len()
        );

        Ok(Neighborhood {
            distance,
            records,
            failed,
        })
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`], or `None`
/// when it has no coordinates.
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
