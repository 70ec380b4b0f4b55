//! Street-tree census `GeoJSON` parsing.
//!
//! Census features are point geometries with the survey attributes in
//! their properties (`tree_id`, `spc_latin`, `spc_common`, `tree_dbh`,
//! `curb_loc`, `status`, `health`, `address`, `zipcode`, `boroname`).
//! Features without an id, a point geometry, or a diameter are skipped.

use std::path::Path;

use geojson::{Feature, GeoJson};
use treefolio_tree_models::{CensusTree, LonLat};

use crate::IngestError;
use crate::value::{as_f64, as_i64, as_string};

/// Parses a census `FeatureCollection`.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not a `GeoJSON`
/// `FeatureCollection`. Individual unusable features are logged and
/// skipped.
pub fn parse_census_trees(text: &str) -> Result<Vec<CensusTree>, IngestError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(IngestError::NotFeatureCollection);
    };

    let total = collection.features.len();
    let trees: Vec<CensusTree> = collection
        .features
        .iter()
        .filter_map(census_tree_from_feature)
        .collect();

    if trees.len() < total {
        log::warn!(
            "Skipped {} of {total} census features without id, point, or diameter",
            total - trees.len()
        );
    }

    Ok(trees)
}

/// Loads every `.geojson` file in `dir`, in file-name order.
///
/// # Errors
///
/// Returns [`IngestError`] if the directory or a file cannot be read or
/// parsed.
pub fn load_census_dir(dir: &Path) -> Result<Vec<CensusTree>, IngestError> {
    let io_err = |path: &Path, source| IngestError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "geojson") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut trees = Vec::new();
    for path in &paths {
        let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let parsed = parse_census_trees(&text)?;
        log::info!("Loaded {} census trees from {}", parsed.len(), path.display());
        trees.extend(parsed);
    }

    Ok(trees)
}

fn census_tree_from_feature(feature: &Feature) -> Option<CensusTree> {
    let location = match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(coords) if coords.len() >= 2 => LonLat::new(coords[0], coords[1]),
        _ => return None,
    };
    if !location.is_finite() {
        return None;
    }

    let props = feature.properties.as_ref()?;
    let text = |key: &str| props.get(key).and_then(as_string);

    Some(CensusTree {
        tree_id: props.get("tree_id").and_then(as_i64)?,
        location,
        species_latin: text("spc_latin"),
        species_common: text("spc_common"),
        dbh: props.get("tree_dbh").and_then(as_f64)?,
        curb_loc: text("curb_loc"),
        status: text("status"),
        health: text("health"),
        address: text("address"),
        zipcode: text("zipcode"),
        borough_name: text("boroname"),
    })
}
