//! Per-scenario metric engine.
//!
//! Classifies parcels, builds one spatial index, then for each
//! configured distance builds `N_d` and reduces it to SHDI, SHEI and
//! LEI. A failure at one distance is logged and zero-fills that
//! distance's columns; the remaining distances still run.

use std::time::Instant;

use vector_metrics_parcel_models::{Growth, Parcel, format_distance};
use vector_metrics_spatial::ParcelIndex;

use crate::assemble::MetricTable;
use crate::classifier::{ClassifierSummary, classify};
use crate::config::MetricsConfig;
use crate::diversity::{class_count, shannon_indices};
use crate::expansion::landscape_expansion;
use crate::growth::assign_growth;
use crate::progress::ProgressCallback;
use crate::{ConfigError, MetricsError};

/// Counters collected while computing a scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Urban/rural counts and missing reference uses.
    pub land_types: ClassifierSummary,
    /// Global number of distinct simulated uses (`k`).
    pub class_count: usize,
    /// Parcels excluded from every neighborhood for invalid geometry.
    pub invalid_geometries: usize,
    /// Focal buffers that could not be built, summed over distances.
    pub failed_buffers: usize,
    /// Non-finite metric values replaced with zero.
    pub coerced_values: usize,
    /// Distances whose columns were zero-filled after an error.
    pub failed_distances: Vec<f64>,
}

/// Metric columns and growth labels of one scenario, row-aligned with
/// the parcel slice they were computed from.
#[derive(Debug, Clone)]
pub struct ScenarioMetrics {
    /// SHDI/SHEI/LEI columns per distance.
    pub table: MetricTable,
    /// Growth label per parcel.
    pub growth: Vec<Growth>,
    /// Run counters.
    pub diagnostics: Diagnostics,
}

/// Computes every metric of a scenario.
///
/// Populates [`Parcel::land_type`] as a side effect.
///
/// # Errors
///
/// Returns an error if `config` fails validation. Per-distance failures
/// are not errors; they are recorded in [`Diagnostics::failed_distances`].
pub fn compute(
    parcels: &mut [Parcel],
    config: &MetricsConfig,
    progress: &dyn ProgressCallback,
) -> Result<ScenarioMetrics, MetricsError> {
    config.validate()?;

    let mut diagnostics = Diagnostics {
        land_types: classify(parcels, &config.vacant_token),
        class_count: class_count(parcels),
        ..Diagnostics::default()
    };
    if diagnostics.class_count <= 1 {
        log::warn!(
            "Only {} simulated use class(es) found, SHEI will be 0 everywhere",
            diagnostics.class_count
        );
    }

    let parcels: &[Parcel] = parcels;
    let index = ParcelIndex::build(parcels);
    diagnostics.invalid_geometries = index.skipped().len();

    let mut table = MetricTable::new(parcels.len());
    progress.set_total(config.distances.len() as u64);

    for &distance in &config.distances {
        progress.set_message(format!("{} m", format_distance(distance)));
        compute_distance(&index, parcels, distance, &mut diagnostics, &mut table);
        progress.inc(1);
    }

    if diagnostics.coerced_values > 0 {
        log::info!(
            "Replaced {} non-finite metric values with 0",
            diagnostics.coerced_values
        );
    }

    let growth_distance = config
        .growth_distance_index()
        .map(|i| config.distances[i])
        .ok_or(ConfigError::GrowthDistanceNotConfigured {
            distance: config.growth_distance,
        })?;
    let growth = assign_growth(parcels, &table, growth_distance, config.growth_threshold)?;

    progress.finish_and_clear();

    Ok(ScenarioMetrics {
        table,
        growth,
        diagnostics,
    })
}

/// Computes one distance's columns into `table`. A neighborhood that cannot
/// be built is logged, recorded in [`Diagnostics::failed_distances`] and
/// zero-filled so the remaining distances still run.
fn compute_distance(
    index: &ParcelIndex,
    parcels: &[Parcel],
    distance: f64,
    diagnostics: &mut Diagnostics,
    table: &mut MetricTable,
) {
    let start = Instant::now();

    match index.neighborhood(parcels, distance) {
        Ok(neighborhood) => {
            let diversity = shannon_indices(&neighborhood.records, diagnostics.class_count);
            let expansion = landscape_expansion(&neighborhood.records);

            diagnostics.failed_buffers += neighborhood.failed.len();
            diagnostics.coerced_values += diversity.coerced + expansion.coerced;
            table.push_distance(distance, &diversity, &expansion);

            log::info!(
                "Computed metrics at {} m ({} pairs) in {:.2}s",
                format_distance(distance),
                neighborhood.records.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            log::error!(
                "Failed to compute metrics at {} m: {e}",
                format_distance(distance)
            );
            diagnostics.failed_distances.push(distance);
            table.push_failed(distance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use geo::{LineString, MultiPolygon, Polygon, polygon};
    use std::f64::consts::LN_2;
    use vector_metrics_parcel_models::{LandType, MetricKind, ParcelId};

    const TOLERANCE: f64 = 1e-9;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    fn parcel(
        id: &str,
        geometry: MultiPolygon<f64>,
        area: f64,
        ref_use: &str,
        sim_use: &str,
        iteration: &str,
    ) -> Parcel {
        Parcel {
            id: ParcelId::from(id),
            geometry,
            area,
            ref_use: Some(ref_use.to_string()),
            sim_use: sim_use.to_string(),
            iteration: Some(iteration.to_string()),
            land_type: LandType::Urban,
            attributes: serde_json::Map::new(),
        }
    }

    fn config(distances: &[f64]) -> MetricsConfig {
        MetricsConfig {
            distances: distances.to_vec(),
            growth_distance: 50.0,
            ..MetricsConfig::default()
        }
    }

    /// Three 10 m squares in a row, 1 m apart: all within 50 m of each
    /// other, none touching.
    fn row_of_three(sim_uses: [&str; 3], areas: [f64; 3]) -> Vec<Parcel> {
        (0..3)
            .map(|i| {
                parcel(
                    &i.to_string(),
                    square(f64::from(i) * 11.0, 0.0, 10.0),
                    areas[i as usize],
                    "residential",
                    sim_uses[i as usize],
                    "1",
                )
            })
            .collect()
    }

    /// 2x2 block of touching 10 m squares.
    fn block(sim_uses: [&str; 4], ref_uses: [&str; 4]) -> Vec<Parcel> {
        let origins = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        origins
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                parcel(
                    &format!("p{i}"),
                    square(x, y, 10.0),
                    100.0,
                    ref_uses[i],
                    sim_uses[i],
                    "1",
                )
            })
            .collect()
    }

    #[test]
    fn single_class_neighborhood() {
        let mut parcels = row_of_three(["residential"; 3], [100.0, 200.0, 300.0]);
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert!(columns.shdi[0].abs() < TOLERANCE);
        assert!(columns.shei[0].abs() < TOLERANCE);
        assert!((columns.lei[0] - 1.0).abs() < TOLERANCE);
        assert_eq!(metrics.diagnostics.class_count, 1);
        assert!(metrics.diagnostics.coerced_values > 0);
    }

    #[test]
    fn two_classes_equal_share() {
        let mut parcels = block(["A", "A", "B", "B"], ["residential"; 4]);
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        for row in 0..4 {
            assert!((columns.shdi[row] - LN_2).abs() < TOLERANCE);
            assert!((columns.shei[row] - 1.0).abs() < TOLERANCE);
        }
        assert_eq!(metrics.diagnostics.coerced_values, 0);
    }

    #[test]
    fn vacant_sim_use_excluded_from_sum() {
        let mut parcels = block(["A", "", "", "A"], ["residential"; 4]);
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert!((columns.shdi[0] - 0.346_573_590_279_972_6).abs() < TOLERANCE);
        assert!((columns.shei[0] - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn all_rural_neighborhood() {
        let mut parcels = block(["A", "B", "A", "B"], ["vacant"; 4]);
        parcels[3].iteration = Some("0".to_string());
        let metrics = compute(&mut parcels, &config(&[25.0, 50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert!(columns.lei.iter().all(|&lei| lei.abs() < TOLERANCE));
        assert_eq!(metrics.growth[0], Growth::Outlying);
        assert_eq!(metrics.growth[3], Growth::NoGrowth);
        assert_eq!(metrics.diagnostics.land_types.rural, 4);
    }

    #[test]
    fn half_urban_is_edge_expansion() {
        let mut parcels = vec![
            parcel("u", square(0.0, 0.0, 10.0), 100.0, "residential", "A", "3"),
            parcel("r", square(10.0, 0.0, 10.0), 100.0, "vacant", "A", "3"),
        ];
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert!((columns.lei[0] - 0.5).abs() < TOLERANCE);
        assert_eq!(metrics.growth, [Growth::EdgeExpansion, Growth::EdgeExpansion]);
    }

    #[test]
    fn isolated_parcel_sees_only_itself() {
        let mut parcels = vec![
            parcel("urban", square(0.0, 0.0, 10.0), 100.0, "residential", "A", "1"),
            parcel("rural", square(1000.0, 0.0, 10.0), 100.0, "vacant", "B", "1"),
        ];
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert_eq!(columns.shdi, [0.0, 0.0]);
        assert_eq!(columns.shei, [0.0, 0.0]);
        assert!((columns.lei[0] - 1.0).abs() < TOLERANCE);
        assert!(columns.lei[1].abs() < TOLERANCE);
        assert_eq!(metrics.growth, [Growth::Infilling, Growth::Outlying]);
    }

    #[test]
    fn invalid_geometry_gets_zero_metrics() {
        let bow_tie = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (10.0, 10.0),
                (10.0, 0.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]),
            vec![],
        )]);
        let mut parcels = vec![
            parcel("ok", square(20.0, 0.0, 10.0), 100.0, "residential", "A", "1"),
            parcel("bad", bow_tie, 100.0, "residential", "B", "1"),
        ];
        let metrics = compute(&mut parcels, &config(&[50.0]), &NullProgress).unwrap();
        let columns = metrics.table.distance(50.0).unwrap();

        assert_eq!(metrics.diagnostics.invalid_geometries, 1);
        assert!((columns.lei[0] - 1.0).abs() < TOLERANCE);
        assert!(columns.lei[1].abs() < TOLERANCE);
        assert!(columns.shdi[1].abs() < TOLERANCE);
        assert_eq!(metrics.growth[1], Growth::Outlying);
    }

    #[test]
    fn invariants_hold_on_mixed_grid() {
        let uses = ["A", "B", "", "C"];
        let mut parcels = Vec::new();
        for row in 0..5 {
            for col in 0..5 {
                let i = row * 5 + col;
                parcels.push(parcel(
                    &format!("{row}-{col}"),
                    square(f64::from(col) * 15.0, f64::from(row) * 15.0, 10.0),
                    f64::from(50 + i * 7),
                    if i % 3 == 0 { "vacant" } else { "residential" },
                    uses[(i % 4) as usize],
                    if i % 5 == 0 { "0" } else { "2" },
                ));
            }
        }

        let distances = [5.0, 25.0, 50.0, 100.0];
        let metrics = compute(&mut parcels, &config(&distances), &NullProgress).unwrap();
        let ln_k = (metrics.diagnostics.class_count as f64).ln();

        assert_eq!(metrics.table.columns().len(), distances.len());
        for columns in metrics.table.columns() {
            for row in 0..parcels.len() {
                let (shdi, shei, lei) = (columns.shdi[row], columns.shei[row], columns.lei[row]);
                assert!(shdi.is_finite() && shei.is_finite() && lei.is_finite());
                assert!((0.0..=ln_k + TOLERANCE).contains(&shdi), "SHDI {shdi}");
                assert!((0.0..=1.0 + TOLERANCE).contains(&shei), "SHEI {shei}");
                assert!((0.0..=1.0).contains(&lei), "LEI {lei}");
            }
        }

        for (parcel, growth) in parcels.iter().zip(&metrics.growth) {
            assert!(Growth::ALL.contains(growth));
            if parcel.is_unchanged() {
                assert_eq!(*growth, Growth::NoGrowth);
            }
        }
    }

    #[test]
    fn failed_distance_is_zero_filled_and_later_distances_still_run() {
        let parcels = row_of_three(["A", "B", "A"], [100.0; 3]);
        let index = ParcelIndex::build(&parcels);
        let mut diagnostics = Diagnostics {
            class_count: class_count(&parcels),
            ..Diagnostics::default()
        };
        let mut table = MetricTable::new(parcels.len());

        for distance in [-10.0, 50.0] {
            compute_distance(&index, &parcels, distance, &mut diagnostics, &mut table);
        }

        assert_eq!(diagnostics.failed_distances, vec![-10.0]);
        assert_eq!(table.columns().len(), 2, "failed distance keeps its columns");

        let failed = table.distance(-10.0).unwrap();
        assert!(failed.failed);
        for kind in MetricKind::ALL {
            assert!(
                failed.values(*kind).iter().all(|v| v.abs() < TOLERANCE),
                "{kind:?} not zero-filled"
            );
        }

        let computed = table.distance(50.0).unwrap();
        assert!(!computed.failed);
        assert!(computed.shdi.iter().all(|v| *v > 0.0), "SHDI {:?}", computed.shdi);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut parcels = row_of_three(["A"; 3], [1.0; 3]);
        let result = compute(&mut parcels, &config(&[25.0]), &NullProgress);
        assert!(matches!(
            result,
            Err(MetricsError::Config(ConfigError::GrowthDistanceNotConfigured { .. }))
        ));
    }
}
