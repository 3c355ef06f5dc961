//! Shannon diversity (SHDI) and evenness (SHEI) over neighborhoods.
//!
//! Class shares are area-weighted: `P_c = A_c / A`, where `A` sums the
//! area of every neighbor, vacant ones included. Vacant neighbors add to
//! the denominator but never contribute a `-P ln P` term.

use std::collections::{BTreeMap, BTreeSet};

use vector_metrics_parcel_models::{Parcel, VACANT_CLASS};
use vector_metrics_spatial::NeighborRecord;

use crate::finite_or_zero;

/// Diversity metrics of one focal parcel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityRow {
    /// Shannon Diversity Index.
    pub shdi: f64,
    /// Shannon Evenness Index, normalized by the global class count.
    pub shei: f64,
    /// Distinct simulated uses in the neighborhood (vacant included).
    pub classes: usize,
}

/// Result of reducing one neighborhood relation.
#[derive(Debug, Clone, Default)]
pub struct DiversityOutcome {
    /// Metrics keyed by focal parcel row.
    pub rows: BTreeMap<usize, DiversityRow>,
    /// Number of non-finite values replaced with zero.
    pub coerced: usize,
}

/// Number of distinct simulated uses across the whole scenario.
///
/// This global `k` normalizes SHEI for every parcel and distance. The
/// vacant sentinel counts as a class.
#[must_use]
pub fn class_count(parcels: &[Parcel]) -> usize {
    parcels
        .iter()
        .map(|p| p.sim_use.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Reduces `N_d` to per-parcel SHDI and SHEI.
///
/// `class_count` is the scenario-wide `k`; when it is 1 or less SHEI is
/// undefined and coerced to 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_indices(records: &[NeighborRecord<'_>], class_count: usize) -> DiversityOutcome {
    let mut areas: BTreeMap<usize, (f64, BTreeMap<&str, f64>)> = BTreeMap::new();
    for record in records {
        let (total, by_class) = areas.entry(record.focal).or_default();
        *total += record.area;
        *by_class.entry(record.sim_use).or_default() += record.area;
    }

    let ln_k = (class_count as f64).ln();
    let mut outcome = DiversityOutcome::default();

    for (focal, (total, by_class)) in areas {
        let mut h = 0.0;
        for (&class, &area) in &by_class {
            if class == VACANT_CLASS {
                continue;
            }
            let p = area / total;
            if p > 0.0 {
                h -= p * p.ln();
            }
        }

        let shdi = finite_or_zero(h, &mut outcome.coerced);
        let shei = finite_or_zero(shdi / ln_k, &mut outcome.coerced);

        outcome.rows.insert(
            focal,
            DiversityRow {
                shdi,
                shei,
                classes: by_class.len(),
            },
        );
    }

    outcome
}
