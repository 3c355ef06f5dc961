//! Landscape Expansion Index (LEI): urban share of neighborhood area.

use std::collections::BTreeMap;

use vector_metrics_parcel_models::LandType;
use vector_metrics_spatial::NeighborRecord;

use crate::finite_or_zero;

/// Result of reducing one neighborhood relation to LEI.
#[derive(Debug, Clone, Default)]
pub struct ExpansionOutcome {
    /// LEI keyed by focal parcel row, in `[0, 1]`.
    pub rows: BTreeMap<usize, f64>,
    /// Number of non-finite values replaced with zero.
    pub coerced: usize,
}

/// Reduces `N_d` to per-parcel `LEI = urban area / total area`.
#[must_use]
pub fn landscape_expansion(records: &[NeighborRecord<'_>]) -> ExpansionOutcome {
    let mut areas: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
    for record in records {
        let (total, urban) = areas.entry(record.focal).or_default();
        *total += record.area;
        if record.land_type == LandType::Urban {
            *urban += record.area;
        }
    }

    let mut outcome = ExpansionOutcome::default();
    for (focal, (total, urban)) in areas {
        let lei = finite_or_zero(urban / total, &mut outcome.coerced);
        outcome.rows.insert(focal, lei);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(neighbors: &[(LandType, f64)]) -> Vec<NeighborRecord<'static>> {
        neighbors
            .iter()
            .enumerate()
            .map(|(neighbor, &(land_type, area))| NeighborRecord {
                focal: 0,
                neighbor,
                area,
                sim_use: "A",
                land_type,
            })
            .collect()
    }

    #[test]
    fn urban_share_of_area() {
        let outcome = landscape_expansion(&records(&[
            (LandType::Urban, 300.0),
            (LandType::Rural, 100.0),
        ]));
        assert!((outcome.rows[&0] - 0.75).abs() < 1e-12);
        assert_eq!(outcome.coerced, 0);
    }

    #[test]
    fn all_rural_is_zero() {
        let outcome = landscape_expansion(&records(&[
            (LandType::Rural, 10.0),
            (LandType::Rural, 20.0),
        ]));
        assert!(outcome.rows[&0].abs() < f64::EPSILON);
    }

    #[test]
    fn all_urban_is_one() {
        let outcome = landscape_expansion(&records(&[(LandType::Urban, 10.0)]));
        assert!((outcome.rows[&0] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_total_area_is_coerced() {
        let outcome = landscape_expansion(&records(&[(LandType::Urban, 0.0)]));
        assert!(outcome.rows[&0].abs() < f64::EPSILON);
        assert_eq!(outcome.coerced, 1);
    }

    #[test]
    fn stays_within_unit_interval() {
        let outcome = landscape_expansion(&records(&[
            (LandType::Urban, 1.0),
            (LandType::Rural, 2.0),
            (LandType::Urban, 3.0),
            (LandType::Rural, 4.0),
        ]));
        let lei = outcome.rows[&0];
        assert!((0.0..=1.0).contains(&lei));
        assert!((lei - 0.4).abs() < 1e-12);
    }
}
