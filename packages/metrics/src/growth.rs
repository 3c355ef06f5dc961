//! Urban growth classification from LEI at the canonical distance.
//!
//! Rules apply in order, later ones overriding earlier ones:
//!
//! | Predicate            | Growth           |
//! |----------------------|------------------|
//! | `LEI == 0`           | `Outlying`       |
//! | `LEI > 0`            | `Edge expansion` |
//! | `LEI > threshold`    | `Infilling`      |
//! | unchanged iteration  | `No growth`      |

use vector_metrics_parcel_models::{MetricKind, Parcel};

pub use vector_metrics_parcel_models::Growth;

use crate::MetricsError;
use crate::assemble::MetricTable;

/// Classifies one parcel. `unchanged` is true for iteration `"0"` or a
/// missing iteration. The threshold comparison is strict.
#[must_use]
pub fn classify_growth(lei: f64, unchanged: bool, threshold: f64) -> Growth {
    if unchanged {
        Growth::NoGrowth
    } else if lei > threshold {
        Growth::Infilling
    } else if lei > 0.0 {
        Growth::EdgeExpansion
    } else {
        Growth::Outlying
    }
}

/// Labels every parcel from the LEI column computed at `distance`.
///
/// # Errors
///
/// Returns [`MetricsError::MissingDistance`] if `table` has no columns
/// for `distance`.
pub fn assign_growth(
    parcels: &[Parcel],
    table: &MetricTable,
    distance: f64,
    threshold: f64,
) -> Result<Vec<Growth>, MetricsError> {
    let columns = table
        .distance(distance)
        .ok_or(MetricsError::MissingDistance { distance })?;

    Ok(parcels
        .iter()
        .zip(&columns.lei)
        .map(|(parcel, &lei)| classify_growth(lei, parcel.is_unchanged(), threshold))
        .collect())
}

/// Recomputes growth for parcels read back from an exported layer, using
/// the `LEI_<distance>` attribute they carry. A missing or non-numeric
/// LEI attribute reads as 0.
#[must_use]
pub fn reclassify(parcels: &[Parcel], distance: f64, threshold: f64) -> Vec<Growth> {
    let column = MetricKind::Lei.column(distance);
    parcels
        .iter()
        .map(|parcel| {
            let lei = parcel
                .attributes
                .get(&column)
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0);
            classify_growth(lei, parcel.is_unchanged(), threshold)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diversity::DiversityOutcome;
    use crate::expansion::ExpansionOutcome;
    use geo::MultiPolygon;
    use vector_metrics_parcel_models::{LandType, ParcelId};

    fn parcel(iteration: Option<&str>) -> Parcel {
        Parcel {
            id: ParcelId::from("1"),
            geometry: MultiPolygon(vec![]),
            area: 1.0,
            ref_use: None,
            sim_use: String::new(),
            iteration: iteration.map(ToString::to_string),
            land_type: LandType::Urban,
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn ordered_rules() {
        assert_eq!(classify_growth(0.0, false, 0.5), Growth::Outlying);
        assert_eq!(classify_growth(0.1, false, 0.5), Growth::EdgeExpansion);
        assert_eq!(classify_growth(0.9, false, 0.5), Growth::Infilling);
        assert_eq!(classify_growth(1.0, false, 0.5), Growth::Infilling);
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify_growth(0.5, false, 0.5), Growth::EdgeExpansion);
        assert_eq!(classify_growth(0.500_001, false, 0.5), Growth::Infilling);
    }

    #[test]
    fn unchanged_parcels_never_grow() {
        for lei in [0.0, 0.3, 0.5, 0.8, 1.0] {
            assert_eq!(classify_growth(lei, true, 0.5), Growth::NoGrowth);
        }
    }

    #[test]
    fn assigns_from_growth_distance_column() {
        let parcels = vec![parcel(Some("2")), parcel(Some("0")), parcel(None), parcel(Some("5"))];
        let mut expansion = ExpansionOutcome::default();
        expansion.rows.insert(0, 0.7);
        expansion.rows.insert(1, 0.7);
        expansion.rows.insert(2, 0.7);
        expansion.rows.insert(3, 0.2);

        let mut table = MetricTable::new(parcels.len());
        table.push_failed(25.0);
        table.push_distance(50.0, &DiversityOutcome::default(), &expansion);

        let growth = assign_growth(&parcels, &table, 50.0, 0.5).unwrap();
        assert_eq!(
            growth,
            [
                Growth::Infilling,
                Growth::NoGrowth,
                Growth::NoGrowth,
                Growth::EdgeExpansion,
            ]
        );

        // Zero-filled distance: every changed parcel is outlying.
        let growth = assign_growth(&parcels, &table, 25.0, 0.5).unwrap();
        assert_eq!(growth[0], Growth::Outlying);

        assert!(matches!(
            assign_growth(&parcels, &table, 75.0, 0.5),
            Err(MetricsError::MissingDistance { .. })
        ));
    }

    #[test]
    fn reclassify_reads_lei_attribute() {
        let mut changed = parcel(Some("1"));
        changed
            .attributes
            .insert("LEI_50".to_string(), serde_json::json!(0.75));
        let mut edge = parcel(Some("1"));
        edge.attributes
            .insert("LEI_50".to_string(), serde_json::json!(0.5));
        let missing = parcel(Some("1"));
        let unchanged = parcel(Some("0"));

        assert_eq!(
            reclassify(&[changed, edge, missing, unchanged], 50.0, 0.5),
            [
                Growth::Infilling,
                Growth::EdgeExpansion,
                Growth::Outlying,
                Growth::NoGrowth,
            ]
        );
    }
}
