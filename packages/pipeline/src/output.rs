//! Serialization of enriched records.
//!
//! Both writers take records one at a time, so a tile can be encoded
//! straight from the lazy record stream without collecting it first.
//!
//! `GeoJSON` output is a `FeatureCollection` with one point feature per
//! line:
//!
//! ```text
//! {"type":"FeatureCollection","features":[
//! {"type":"Feature","geometry":{...},"properties":{...}},
//! {"type":"Feature","geometry":{...},"properties":{...}}
//! ]}
//! ```

use std::io::Write;

use geojson::Geometry;
use serde::Serialize;
use treefolio_pipeline_models::OutputFormat;
use treefolio_tree_models::EnrichedRecord;

/// Errors that can occur while encoding records.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Serialize)]
struct PointFeature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Geometry,
    properties: &'a EnrichedRecord,
}

impl<'a> PointFeature<'a> {
    fn new(record: &'a EnrichedRecord) -> Self {
        let location = record.updated_location;
        Self {
            kind: "Feature",
            geometry: Geometry::new(geojson::Value::Point(vec![location.lon, location.lat])),
            properties: record,
        }
    }
}

/// Incremental `GeoJSON` `FeatureCollection` writer.
pub struct GeoJsonWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> GeoJsonWriter<W> {
    /// Starts a collection on `out`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the header cannot be written.
    pub fn new(mut out: W) -> Result<Self, OutputError> {
        out.write_all(br#"{"type":"FeatureCollection","features":["#)?;
        Ok(Self { out, count: 0 })
    }

    /// Appends one feature.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if serialization or the write fails.
    pub fn write(&mut self, record: &EnrichedRecord) -> Result<(), OutputError> {
        if self.count > 0 {
            self.out.write_all(b",")?;
        }
        self.out.write_all(b"\n")?;
        serde_json::to_writer(&mut self.out, &PointFeature::new(record))?;
        self.count += 1;
        Ok(())
    }

    /// Closes the collection and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the trailer cannot be written.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.out.write_all(b"\n]}\n")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Encodes `records` in `format` into `out`, returning the record count.
///
/// # Errors
///
/// Returns [`OutputError`] if any record cannot be serialized or written.
pub fn encode<I, W>(format: OutputFormat, records: I, out: W) -> Result<usize, OutputError>
where
    I: IntoIterator<Item = EnrichedRecord>,
    W: Write,
{
    let mut count = 0;
    match format {
        OutputFormat::Geojson => {
            let mut writer = GeoJsonWriter::new(out)?;
            for record in records {
                writer.write(&record)?;
                count += 1;
            }
            writer.finish()?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for record in records {
                writer.serialize(&record)?;
                count += 1;
            }
            writer.flush()?;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use geojson::GeoJson;
    use treefolio_tree_models::LonLat;

    use super::*;

    fn record(id: i64, census: bool) -> EnrichedRecord {
        EnrichedRecord {
            tree_count_id: id,
            tile_id: "987185".to_string(),
            recorded_year: 2017,
            top_of_canopy_height: 12.5,
            canopy_volume: 140.0,
            canopy_area: 22.0,
            in_park: false,
            ground_height: 3.0,
            foliage_height: 12.5,
            boro_code: Some("3".to_string()),
            boro_name: Some("Brooklyn".to_string()),
            tree_shadow_point_count: Some(10.0),
            rel_noon_shaded_area: Some(4.0),
            rel_noon_shaded_area_ground: None,
            rel_noon_perc_canopy_street_shade: None,
            rel_noon_perc_canopy_in_shade: None,
            daily_avg_shaded_area: None,
            daily_avg_shaded_area_ground: None,
            daily_avg_perc_canopy_street_shade: None,
            daily_avg_perc_canopy_in_shade: None,
            high_temp_avg_shaded_area: None,
            high_temp_avg_shaded_area_ground: None,
            high_temp_avg_perc_canopy_street_shade: None,
            high_temp_avg_perc_canopy_in_shade: None,
            predicted_latitude: 40.65,
            predicted_longitude: -73.95,
            distance: Some(0.0001),
            is_nearest: census,
            has_census_id: census,
            census_id: census.then_some(99),
            census_latitude: census.then_some(40.65),
            census_longitude: census.then_some(-73.95),
            spc_latin: None,
            spc_common: census.then(|| "pin oak".to_string()),
            tree_dbh: census.then_some(10.0),
            canopy_radius: Some(4.2),
            curb_loc: None,
            status: None,
            health: None,
            address: None,
            zipcode: None,
            census_boro_name: None,
            updated_location: LonLat::new(-73.95, 40.65),
        }
    }

    #[test]
    fn geojson_output_is_a_feature_collection() {
        let mut bytes = Vec::new();
        let count = encode(
            OutputFormat::Geojson,
            vec![record(1, true), record(2, false)],
            &mut bytes,
        )
        .unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(bytes).unwrap();
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>().unwrap() else {
            panic!("expected a FeatureCollection");
        };
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        let Some(geojson::Value::Point(coords)) = first.geometry.as_ref().map(|g| &g.value) else {
            panic!("expected a point geometry");
        };
        assert_eq!(coords, &vec![-73.95, 40.65]);

        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["Tree_CountID"], 1);
        assert_eq!(props["Census_id"], 99);
        assert_eq!(props["Spc_common"], "pin oak");

        let second = collection.features[1].properties.as_ref().unwrap();
        assert!(second["Census_id"].is_null());
        assert_eq!(second["hasTreeCensusID"], false);
    }

    #[test]
    fn empty_geojson_is_still_valid() {
        let mut bytes = Vec::new();
        encode(OutputFormat::Geojson, Vec::new(), &mut bytes).unwrap();
        let parsed = String::from_utf8(bytes).unwrap().parse::<GeoJson>().unwrap();
        let GeoJson::FeatureCollection(collection) = parsed else {
            panic!("expected a FeatureCollection");
        };
        assert!(collection.features.is_empty());
    }

    #[test]
    fn csv_output_has_published_headers() {
        let mut bytes = Vec::new();
        encode(OutputFormat::Csv, vec![record(1, true), record(2, false)], &mut bytes).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Tree_CountID");
        assert_eq!(&headers[2], "Recorded Year");
        assert!(headers.iter().any(|h| h == "Canopy_radius"));
        assert!(!headers.iter().any(|h| h == "updated_location"));

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        let census_col = headers.iter().position(|h| h == "Census_id").unwrap();
        assert_eq!(&rows[0][census_col], "99");
        assert_eq!(&rows[1][census_col], "");
    }
}
