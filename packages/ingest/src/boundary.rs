//! Borough boundary `GeoJSON` parsing.

use std::path::Path;

use geojson::GeoJson;
use treefolio_spatial::{BoroughPolygon, geometry_to_multipolygon};

use crate::IngestError;
use crate::value::as_string;

/// Parses borough polygons from a `FeatureCollection` whose features carry
/// `boro_code` and `boro_name` properties.
///
/// Features without both properties or without polygonal geometry are
/// logged and skipped. The returned order is the feature order, which
/// is the lookup order of the boundary index.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not a `GeoJSON`
/// `FeatureCollection`.
pub fn parse_borough_boundaries(text: &str) -> Result<Vec<BoroughPolygon>, IngestError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(IngestError::NotFeatureCollection);
    };

    let mut polygons = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.as_ref();
        let code = props.and_then(|p| p.get("boro_code")).and_then(as_string);
        let name = props.and_then(|p| p.get("boro_name")).and_then(as_string);

        let (Some(code), Some(name)) = (code, name) else {
            log::warn!("Skipping boundary feature {i}: missing boro_code or boro_name");
            continue;
        };

        let Some(geometry) = feature.geometry.and_then(geometry_to_multipolygon) else {
            log::warn!("Skipping boundary {name}: geometry is not a polygon");
            continue;
        };

        polygons.push(BoroughPolygon {
            code,
            name,
            geometry,
        });
    }

    Ok(polygons)
}

/// Reads and parses a borough boundary file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_borough_boundaries(path: &Path) -> Result<Vec<BoroughPolygon>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let polygons = parse_borough_boundaries(&text)?;
    log::info!(
        "Loaded {} borough boundaries from {}",
        polygons.len(),
        path.display()
    );
    Ok(polygons)
}
