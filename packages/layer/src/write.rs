//! Writes enriched parcels as a `GeoJSON` polygon layer and a CSV table.
//!
//! Both outputs carry the source attributes followed by `SHDI_d`,
//! `SHEI_d`, `LEI_d` for every distance and finally `GROWTH`. Metric
//! columns already present in the source (e.g. when re-running on an
//! exported layer) are overwritten.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::{Value, json};
use vector_metrics::{MetricsConfig, ScenarioMetrics};
use vector_metrics_parcel_models::{GROWTH_COLUMN, Parcel};

use crate::LayerError;

type OutputWriter = fn(&Path, &[Parcel], &ScenarioMetrics) -> Result<(), LayerError>;

/// Legacy `GeoJSON` CRS name of the metric planar CRS the layers use.
pub const CRS_NAME: &str = "urn:ogc:def:crs:EPSG::25830";

/// Builds the enriched `FeatureCollection`.
#[must_use]
pub fn feature_collection(parcels: &[Parcel], metrics: &ScenarioMetrics) -> FeatureCollection {
    let features = parcels
        .iter()
        .enumerate()
        .map(|(row, parcel)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&parcel.geometry))),
            id: None,
            properties: Some(enriched_properties(parcel, metrics, row)),
            foreign_members: None,
        })
        .collect();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        json!({ "type": "name", "properties": { "name": CRS_NAME } }),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

fn enriched_properties(parcel: &Parcel, metrics: &ScenarioMetrics, row: usize) -> JsonObject {
    let mut properties = parcel.attributes.clone();
    for (column, value) in metrics.table.row(row) {
        properties.insert(column, Value::from(value));
    }
    properties.insert(
        GROWTH_COLUMN.to_string(),
        Value::String(metrics.growth[row].to_string()),
    );
    properties
}

/// Writes the enriched polygon layer to `path`.
///
/// # Errors
///
/// Returns [`LayerError::Write`] if the file cannot be written.
pub fn write_geojson(
    path: &Path,
    parcels: &[Parcel],
    metrics: &ScenarioMetrics,
) -> Result<(), LayerError> {
    let file = std::fs::File::create(path).map_err(|source| LayerError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_collection(
        BufWriter::new(file),
        path,
        &feature_collection(parcels, metrics),
    )?;

    log::info!("Wrote {} features to {}", parcels.len(), path.display());
    Ok(())
}

/// Serializes `collection` into `writer`. I/O failures are reported as
/// [`LayerError::Write`] against `path`.
fn write_collection<W: Write>(
    mut writer: W,
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), LayerError> {
    let write_error = |source| LayerError::Write {
        path: path.to_path_buf(),
        source,
    };

    serde_json::to_writer(&mut writer, collection).map_err(|e| {
        if e.is_io() {
            write_error(e.into())
        } else {
            LayerError::Json(e)
        }
    })?;
    writer.flush().map_err(write_error)
}

/// Writes the enriched attribute table as CSV to `writer`.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized or written.
pub fn write_table<W: Write>(
    writer: W,
    parcels: &[Parcel],
    metrics: &ScenarioMetrics,
) -> Result<(), LayerError> {
    let metric_columns = metrics.table.column_names();

    let mut attribute_columns: Vec<&str> = Vec::new();
    for parcel in parcels {
        for key in parcel.attributes.keys() {
            let key = key.as_str();
            if key != GROWTH_COLUMN
                && !metric_columns.iter().any(|c| c == key)
                && !attribute_columns.contains(&key)
            {
                attribute_columns.push(key);
            }
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);

    let header: Vec<&str> = attribute_columns
        .iter()
        .copied()
        .chain(metric_columns.iter().map(String::as_str))
        .chain(std::iter::once(GROWTH_COLUMN))
        .collect();
    csv_writer.write_record(&header)?;

    for (row, parcel) in parcels.iter().enumerate() {
        let mut record: Vec<String> = attribute_columns
            .iter()
            .map(|key| parcel.attributes.get(*key).map(cell).unwrap_or_default())
            .collect();
        record.extend(
            metrics
                .table
                .row(row)
                .into_iter()
                .map(|(_, value)| value.to_string()),
        );
        record.push(metrics.growth[row].to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes the enriched attribute table as CSV to `path`.
///
/// # Errors
///
/// Returns [`LayerError::Write`] if the file cannot be created, or a CSV
/// error if a record cannot be written.
pub fn write_csv(
    path: &Path,
    parcels: &[Parcel],
    metrics: &ScenarioMetrics,
) -> Result<(), LayerError> {
    let file = std::fs::File::create(path).map_err(|source| LayerError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_table(BufWriter::new(file), parcels, metrics)?;

    log::info!("Wrote {} rows to {}", parcels.len(), path.display());
    Ok(())
}

/// Writes both outputs of `scenario` under the configured output
/// directory and returns their paths.
///
/// Without `partial_output` the first failure aborts; with it, every
/// output is attempted and the first failure is returned afterwards.
///
/// # Errors
///
/// Returns the first write failure.
pub fn write_outputs(
    config: &MetricsConfig,
    scenario: &str,
    parcels: &[Parcel],
    metrics: &ScenarioMetrics,
) -> Result<Vec<PathBuf>, LayerError> {
    let output_dir = config.output_path();
    std::fs::create_dir_all(&output_dir).map_err(|source| LayerError::Write {
        path: output_dir.clone(),
        source,
    })?;

    let layer_path = output_dir.join(format!("metrics_{scenario}.geojson"));
    let table_path = output_dir.join(format!("metrics_{scenario}.csv"));

    let writers: [(PathBuf, OutputWriter); 2] =
        [(layer_path, write_geojson), (table_path, write_csv)];

    let mut written = Vec::new();
    let mut first_error = None;
    for (path, write) in writers {
        match write(&path, parcels, metrics) {
            Ok(()) => written.push(path),
            Err(e) if config.partial_output => {
                log::error!("{e}");
                first_error.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

/// Formats an attribute for a CSV cell. Null is empty; strings are
/// written without quotes.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
