use super::{validate_sink, write_atomically, PublishAck, PublishError, Publisher};
use crate::dataset::{Dataset, Value};
use serde_json::{json, Map};
use std::path::PathBuf;

/// Publishes the designated subset (rows whose boolean designation column
/// is true) as a GeoJSON `FeatureCollection` at `<dir>/<sink>.geojson`.
///
/// Rows without a geometry become features with a `null` geometry.
#[derive(Debug, Clone)]
pub struct GeoJsonPublisher {
    dir: PathBuf,
    designation_column: String,
    geometry_column: String,
}

impl GeoJsonPublisher {
    pub fn new(
        dir: impl Into<PathBuf>,
        designation_column: impl Into<String>,
        geometry_column: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            designation_column: designation_column.into(),
            geometry_column: geometry_column.into(),
        }
    }

    pub fn output_path(&self, sink: &str) -> PathBuf {
        self.dir.join(format!("{}.geojson", sink))
    }

    /// Build the feature collection for the designated subset.
    pub fn feature_collection(&self, dataset: &Dataset) -> Result<serde_json::Value, PublishError> {
        let subset = dataset.designated_subset(&self.designation_column)?;
        let mut missing_geometry = 0usize;

        let features: Vec<serde_json::Value> = subset
            .records
            .iter()
            .map(|record| {
                let geometry = match record.get(&self.geometry_column) {
                    Some(Value::Geometry(g)) => serde_json::to_value(g).unwrap_or_default(),
                    _ => {
                        missing_geometry += 1;
                        serde_json::Value::Null
                    }
                };
                let properties: Map<String, serde_json::Value> = record
                    .iter()
                    .filter(|(column, _)| **column != self.geometry_column)
                    .map(|(column, value)| {
                        (column.clone(), serde_json::to_value(value).unwrap_or_default())
                    })
                    .collect();
                json!({
                    "type": "Feature",
                    "geometry": geometry,
                    "properties": properties,
                })
            })
            .collect();

        if missing_geometry > 0 {
            log::warn!(
                "{} designated rows have no '{}' geometry",
                missing_geometry,
                self.geometry_column
            );
        }
        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }
}

impl Publisher for GeoJsonPublisher {
    fn publish(&self, dataset: &Dataset, sink: &str) -> Result<PublishAck, PublishError> {
        validate_sink(sink)?;
        let collection = self.feature_collection(dataset)?;
        let rows_written = collection["features"].as_array().map_or(0, Vec::len);

        let encoded = serde_json::to_vec(&collection).map_err(|source| PublishError::Encode {
            sink: sink.to_string(),
            source,
        })?;
        let path = self.output_path(sink);
        write_atomically(&path, &encoded)?;

        log::info!(
            "Published {} designated features to {}",
            rows_written,
            path.display()
        );
        Ok(PublishAck {
            sink: sink.to_string(),
            location: path.display().to_string(),
            rows_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{record, DatasetError, Geometry};

    fn dataset() -> Dataset {
        let mut ds = Dataset::new("opa_id").with_records(vec![
            record([
                ("opa_id", Value::from("1")),
                ("vacant", Value::Bool(true)),
                ("geometry", Value::Geometry(Geometry::Point([-75.1, 39.9]))),
            ]),
            record([
                ("opa_id", Value::from("2")),
                ("vacant", Value::Bool(false)),
                ("geometry", Value::Geometry(Geometry::Point([-75.2, 39.8]))),
            ]),
            record([("opa_id", Value::from("3")), ("vacant", Value::Null)]),
            record([("opa_id", Value::from("4")), ("vacant", Value::Bool(true))]),
        ]);
        ds.infer_schema();
        ds
    }

    #[test]
    fn test_only_designated_rows_are_published() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = GeoJsonPublisher::new(dir.path(), "vacant", "geometry");

        let ack = publisher.publish(&dataset(), "vacant_properties").unwrap();
        assert_eq!(ack.rows_written, 2);

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(publisher.output_path("vacant_properties")).unwrap(),
        )
        .unwrap();
        let features = written["features"].as_array().unwrap();
        assert_eq!(features[0]["properties"]["opa_id"], "1");
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert!(features[0]["properties"].get("geometry").is_none());
        assert!(features[1]["geometry"].is_null());
    }

    #[test]
    fn test_missing_designation_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = GeoJsonPublisher::new(dir.path(), "is_vacant", "geometry");
        let err = publisher.publish(&dataset(), "vacant_properties").unwrap_err();
        assert!(matches!(
            err,
            PublishError::Dataset(DatasetError::MissingColumn(ref c)) if c == "is_vacant"
        ));
    }
}
