//! Urban/rural labelling from the reference land use.

use vector_metrics_parcel_models::{LandType, Parcel};

/// Counts produced by [`classify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierSummary {
    /// Parcels labelled [`LandType::Urban`].
    pub urban: usize,
    /// Parcels labelled [`LandType::Rural`].
    pub rural: usize,
    /// Urban parcels whose reference use was missing.
    pub missing_ref_use: usize,
}

/// Labels a reference land use.
///
/// A missing reference use is urban: only the vacant token makes a
/// parcel rural.
#[must_use]
pub fn land_type(ref_use: Option<&str>, vacant_token: &str) -> LandType {
    match ref_use {
        Some(value) if value == vacant_token => LandType::Rural,
        _ => LandType::Urban,
    }
}

/// Populates [`Parcel::land_type`] for every parcel.
pub fn classify(parcels: &mut [Parcel], vacant_token: &str) -> ClassifierSummary {
    let mut summary = ClassifierSummary::default();

    for parcel in parcels.iter_mut() {
        parcel.land_type = land_type(parcel.ref_use.as_deref(), vacant_token);
        match parcel.land_type {
            LandType::Urban => summary.urban += 1,
            LandType::Rural => summary.rural += 1,
        }
        if parcel.ref_use.is_none() {
            summary.missing_ref_use += 1;
        }
    }

    if summary.missing_ref_use > 0 {
        log::warn!(
            "{} parcels have no reference use and were classified as urban",
            summary.missing_ref_use
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;
    use vector_metrics_parcel_models::ParcelId;

    fn parcel(ref_use: Option<&str>) -> Parcel {
        Parcel {
            id: ParcelId::from("1"),
            geometry: MultiPolygon(vec![]),
            area: 1.0,
            ref_use: ref_use.map(ToString::to_string),
            sim_use: String::new(),
            iteration: None,
            land_type: LandType::Urban,
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn vacant_is_rural_everything_else_urban() {
        assert_eq!(land_type(Some("vacant"), "vacant"), LandType::Rural);
        assert_eq!(land_type(Some("residential"), "vacant"), LandType::Urban);
        assert_eq!(land_type(Some(""), "vacant"), LandType::Urban);
        assert_eq!(land_type(Some("Vacant"), "vacant"), LandType::Urban);
    }

    #[test]
    fn missing_reference_use_is_urban_and_counted() {
        let mut parcels = vec![
            parcel(Some("vacant")),
            parcel(None),
            parcel(Some("industrial")),
        ];
        let summary = classify(&mut parcels, "vacant");

        assert_eq!(parcels[0].land_type, LandType::Rural);
        assert_eq!(parcels[1].land_type, LandType::Urban);
        assert_eq!(parcels[2].land_type, LandType::Urban);
        assert_eq!(
            summary,
            ClassifierSummary {
                urban: 2,
                rural: 1,
                missing_ref_use: 1,
            }
        );
    }

    #[test]
    fn custom_vacant_token() {
        assert_eq!(land_type(Some("baldio"), "baldio"), LandType::Rural);
        assert_eq!(land_type(Some("vacant"), "baldio"), LandType::Urban);
    }
}
