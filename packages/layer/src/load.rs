//! Reads a `GeoJSON` parcel layer into [`Parcel`]s.
//!
//! Attribute names come from [`MetricsConfig`]. Every required attribute
//! must be present on every feature (its value may be null), identifiers
//! must be unique and geometries must be `Polygon` or `MultiPolygon`.

use std::collections::BTreeSet;
use std::path::Path;

use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use serde_json::Value;
use vector_metrics::MetricsConfig;
use vector_metrics_parcel_models::{LandType, Parcel, ParcelId, VACANT_CLASS};

use crate::LayerError;

/// Reads and parses the layer at `path`.
///
/// # Errors
///
/// Returns [`LayerError::InputMissing`] if the file cannot be read, or any
/// error of [`parse_parcels`].
pub fn read_parcels(path: &Path, config: &MetricsConfig) -> Result<Vec<Parcel>, LayerError> {
    let content = std::fs::read_to_string(path).map_err(|source| LayerError::InputMissing {
        path: path.to_path_buf(),
        source,
    })?;
    let parcels = parse_parcels(&content, config)?;
    log::info!("Loaded {} parcels from {}", parcels.len(), path.display());
    Ok(parcels)
}

/// Parses a `GeoJSON` `FeatureCollection` into parcels, in feature order.
///
/// # Errors
///
/// Returns an error on malformed `GeoJSON`, a missing required attribute,
/// an unusable identifier, area or geometry, or a repeated identifier.
pub fn parse_parcels(content: &str, config: &MetricsConfig) -> Result<Vec<Parcel>, LayerError> {
    let GeoJson::FeatureCollection(collection) = content.parse::<GeoJson>()? else {
        return Err(LayerError::NotAFeatureCollection);
    };

    let schema = config.schema_attributes();
    let mut seen = BTreeSet::new();
    let mut parcels = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let parcel = parse_feature(index, feature, &schema, config)?;
        if !seen.insert(parcel.id.clone()) {
            return Err(LayerError::DuplicateId {
                id: parcel.id.to_string(),
            });
        }
        parcels.push(parcel);
    }

    Ok(parcels)
}

fn parse_feature(
    index: usize,
    feature: Feature,
    schema: &[&str],
    config: &MetricsConfig,
) -> Result<Parcel, LayerError> {
    let attributes = feature.properties.unwrap_or_default();

    if let Some(missing) = schema.iter().find(|attr| !attributes.contains_key(**attr)) {
        return Err(LayerError::SchemaMismatch {
            attribute: (*missing).to_string(),
            feature: index,
        });
    }

    let invalid = |name: &str, message: &str| LayerError::InvalidAttribute {
        attribute: name.to_string(),
        feature: index,
        message: message.to_string(),
    };

    let id = text_value(attribute(&attributes, &config.id_attr))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid(&config.id_attr, "identifier must not be null or empty"))?;

    let area = match attribute(&attributes, &config.area_attr) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|area| area.is_finite() && *area > 0.0)
    .ok_or_else(|| invalid(&config.area_attr, "expected a finite positive number"))?;

    let geometry = feature
        .geometry
        .ok_or_else(|| LayerError::InvalidGeometry {
            feature: index,
            message: "feature has no geometry".to_string(),
        })
        .and_then(|geometry| to_multi_polygon(index, geometry))?;

    let ref_use = text_value(attribute(&attributes, &config.ref_use_attr));
    let sim_use = text_value(attribute(&attributes, &config.sim_use_attr))
        .unwrap_or_else(|| VACANT_CLASS.to_string());
    let iteration = text_value(attribute(&attributes, &config.iteration_attr));

    Ok(Parcel {
        id: ParcelId(id),
        geometry,
        area,
        ref_use,
        sim_use,
        iteration,
        land_type: LandType::default(),
        attributes,
    })
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multi_polygon(
    index: usize,
    geometry: geojson::Geometry,
) -> Result<MultiPolygon<f64>, LayerError> {
    let geo_geom: geo::Geometry<f64> =
        geometry
            .try_into()
            .map_err(|e: geojson::Error| LayerError::InvalidGeometry {
                feature: index,
                message: e.to_string(),
            })?;

    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err(LayerError::InvalidGeometry {
            feature: index,
            message: "expected a Polygon or MultiPolygon".to_string(),
        }),
    }
}

static NULL: Value = Value::Null;

/// Looks up an attribute, reading an absent key as null.
fn attribute<'a>(attributes: &'a serde_json::Map<String, Value>, name: &str) -> &'a Value {
    attributes.get(name).unwrap_or(&NULL)
}

/// Reads an attribute as text. Null is `None`; integral numbers lose any
/// fractional part so `0` and `0.0` both read as `"0"`.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}
