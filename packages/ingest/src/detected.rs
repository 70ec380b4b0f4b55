//! LiDAR detected-tree JSON records.
//!
//! Each detected tree is stored as its own JSON document:
//!
//! ```json
//! {
//!   "Tree_CountId": 12,
//!   "RecordedYear": 2017,
//!   "PredictedTreeLocation": { "Latitude": 40.65, "Longitude": -73.95 },
//!   "TreeFoliageHeight": 14.2,
//!   "GroundZValue": 8.1,
//!   "ConvexHull_TreeDict": { "volume": 310.5, "area": 48.0 },
//!   "InPark": false
//! }
//! ```

use serde_json::Value;
use treefolio_tree_models::{DetectedTree, LonLat};

use crate::IngestError;
use crate::value::{as_bool, as_f64, as_i64};

/// Parses one detected-tree record belonging to `tile_id`.
///
/// # Errors
///
/// * [`IngestError::Json`] if the bytes are not valid JSON.
/// * [`IngestError::MissingField`] if `Tree_CountId` or a usable
///   `PredictedTreeLocation` is absent.
/// * [`IngestError::IncompleteRecord`] if any measurement is absent.
pub fn parse_detected_tree(
    bytes: &[u8],
    tile_id: &str,
    key: &str,
) -> Result<DetectedTree, IngestError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(|source| IngestError::Json {
        key: key.to_string(),
        source,
    })?;

    let missing = |field: &'static str| IngestError::MissingField {
        tile_id: tile_id.to_string(),
        key: key.to_string(),
        field,
    };
    let incomplete = |field: &'static str| IngestError::IncompleteRecord {
        tile_id: tile_id.to_string(),
        key: key.to_string(),
        field,
    };

    let tree_count_id = doc
        .get("Tree_CountId")
        .and_then(as_i64)
        .ok_or_else(|| missing("Tree_CountId"))?;

    let location = doc
        .get("PredictedTreeLocation")
        .ok_or_else(|| missing("PredictedTreeLocation"))?;
    let lon = location
        .get("Longitude")
        .and_then(as_f64)
        .ok_or_else(|| missing("PredictedTreeLocation.Longitude"))?;
    let lat = location
        .get("Latitude")
        .and_then(as_f64)
        .ok_or_else(|| missing("PredictedTreeLocation.Latitude"))?;

    let recorded_year = doc
        .get("RecordedYear")
        .and_then(as_i64)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| incomplete("RecordedYear"))?;
    let foliage_height = doc
        .get("TreeFoliageHeight")
        .and_then(as_f64)
        .ok_or_else(|| incomplete("TreeFoliageHeight"))?;
    let ground_z = doc
        .get("GroundZValue")
        .and_then(as_f64)
        .ok_or_else(|| incomplete("GroundZValue"))?;

    let hull = doc.get("ConvexHull_TreeDict");
    let canopy_volume = hull
        .and_then(|h| h.get("volume"))
        .and_then(as_f64)
        .ok_or_else(|| incomplete("ConvexHull_TreeDict.volume"))?;
    let canopy_area = hull
        .and_then(|h| h.get("area"))
        .and_then(as_f64)
        .ok_or_else(|| incomplete("ConvexHull_TreeDict.area"))?;

    let in_park = doc
        .get("InPark")
        .and_then(as_bool)
        .ok_or_else(|| incomplete("InPark"))?;

    Ok(DetectedTree {
        tree_count_id,
        tile_id: tile_id.to_string(),
        recorded_year,
        predicted_location: LonLat::new(lon, lat),
        foliage_height,
        ground_z,
        canopy_volume,
        canopy_area,
        in_park,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> Value {
        json!({
            "Tree_CountId": 12,
            "RecordedYear": 2017,
            "PredictedTreeLocation": { "Latitude": 40.65, "Longitude": -73.95 },
            "TreeFoliageHeight": 14.2,
            "GroundZValue": 8.1,
            "ConvexHull_TreeDict": { "volume": 310.5, "area": 48.0 },
            "InPark": false,
            "Cluster_Points": [[1, 2, 3]]
        })
    }

    fn parse(value: &Value) -> Result<DetectedTree, IngestError> {
        parse_detected_tree(value.to_string().as_bytes(), "987185", "12.json")
    }

    #[test]
    fn parses_full_record() {
        let tree = parse(&record()).unwrap();
        assert_eq!(tree.tree_count_id, 12);
        assert_eq!(tree.tile_id, "987185");
        assert_eq!(tree.recorded_year, 2017);
        assert_eq!(tree.predicted_location, LonLat::new(-73.95, 40.65));
        assert!((tree.canopy_volume - 310.5).abs() < f64::EPSILON);
        assert!(!tree.in_park);
    }

    #[test]
    fn missing_id_is_tile_fatal() {
        let mut value = record();
        value.as_object_mut().unwrap().remove("Tree_CountId");
        let err = parse(&value).unwrap_err();
        assert!(matches!(err, IngestError::MissingField { field: "Tree_CountId", .. }));
        assert!(err.is_tile_fatal());
    }

    #[test]
    fn missing_location_is_tile_fatal() {
        let mut value = record();
        value["PredictedTreeLocation"] = json!({ "Latitude": 40.65 });
        let err = parse(&value).unwrap_err();
        assert!(err.is_tile_fatal());
    }

    #[test]
    fn missing_measurement_is_tile_fatal() {
        let mut value = record();
        value.as_object_mut().unwrap().remove("ConvexHull_TreeDict");
        let err = parse(&value).unwrap_err();
        assert!(matches!(
            err,
            IngestError::IncompleteRecord { field: "ConvexHull_TreeDict.volume", .. }
        ));
        assert!(err.is_tile_fatal());
    }

    #[test]
    fn invalid_json_only_skips_record() {
        let err = parse_detected_tree(b"{not json", "987185", "bad.json").unwrap_err();
        assert!(matches!(err, IngestError::Json { .. }));
        assert!(!err.is_tile_fatal());
    }
}
