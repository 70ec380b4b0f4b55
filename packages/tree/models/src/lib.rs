#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tree record types shared across the matching pipeline.
//!
//! Three upstream datasets feed the pipeline: LiDAR-detected trees
//! ([`DetectedTree`]), the municipal street-tree census ([`CensusTree`]),
//! and per-tree shading simulation output ([`ShadeSample`]). The pipeline
//! joins them into one [`EnrichedRecord`] per detected tree.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A WGS84 longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LonLat {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns the point as an `[x, y]` array (longitude first).
    #[must_use]
    pub const fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// Both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// A tree located by the upstream LiDAR detection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedTree {
    /// Per-tile tree identifier (`Tree_CountId`).
    pub tree_count_id: i64,
    /// Tile the tree was detected in.
    pub tile_id: String,
    /// Year of the LiDAR capture.
    pub recorded_year: i32,
    /// Predicted trunk location.
    pub predicted_location: LonLat,
    /// Top-of-canopy height.
    pub foliage_height: f64,
    /// Ground elevation under the tree.
    pub ground_z: f64,
    /// Convex-hull canopy volume.
    pub canopy_volume: f64,
    /// Convex-hull canopy area.
    pub canopy_area: f64,
    /// Whether the tree lies inside a park.
    pub in_park: bool,
}

/// A municipally surveyed street tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusTree {
    /// Census `tree_id`.
    pub tree_id: i64,
    /// Surveyed location.
    pub location: LonLat,
    /// Latin species name (`spc_latin`).
    pub species_latin: Option<String>,
    /// Common species name (`spc_common`).
    pub species_common: Option<String>,
    /// Diameter at breast height, in inches.
    pub dbh: f64,
    /// Curb location (`OnCurb` / `OffsetFromCurb`).
    pub curb_loc: Option<String>,
    /// Survey status (`Alive`, `Stump`, `Dead`).
    pub status: Option<String>,
    /// Health rating.
    pub health: Option<String>,
    /// Street address of the nearest building.
    pub address: Option<String>,
    /// Five-digit zipcode.
    pub zipcode: Option<String>,
    /// Borough name as recorded by the census.
    pub borough_name: Option<String>,
}

/// Borough attributes attached to a detected tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoroughInfo {
    /// Borough code (`boro_code`).
    pub code: String,
    /// Borough name (`boro_name`).
    pub name: String,
}

/// One row of a per-tree shading simulation time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadeSample {
    /// Local timestamp of the simulated sun position.
    pub timestamp: NaiveDateTime,
    /// Sun elevation amplitude.
    pub sun_amplitude: f64,
    /// Total shadow area cast by the canopy.
    pub shadow_area: f64,
    /// Shadow area landing on the ground.
    pub shadow_area_ground: f64,
    /// Percentage of canopy shade falling on the street.
    pub pct_canopy_street_shade: f64,
    /// Percentage of the canopy itself in shade.
    pub pct_canopy_in_shade: f64,
    /// Number of points in the shadow.
    pub tree_shadow_point_count: i64,
}

/// Mean shading values at peak sun amplitude ("relative noon").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakShade {
    pub tree_shadow_point_count: Option<f64>,
    pub shaded_area: Option<f64>,
    pub shaded_area_ground: Option<f64>,
    pub perc_canopy_street_shade: Option<f64>,
    pub perc_canopy_in_shade: Option<f64>,
}

/// Mean of the four area/percentage shading values over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadeAverages {
    pub shaded_area: Option<f64>,
    pub shaded_area_ground: Option<f64>,
    pub perc_canopy_street_shade: Option<f64>,
    pub perc_canopy_in_shade: Option<f64>,
}

/// The fixed 13-value shading summary of one tree.
///
/// The default value (all `None`) is the summary of a tree without
/// shading simulation coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadeStats {
    /// Rows at maximum sun amplitude.
    pub peak: PeakShade,
    /// All rows of the reference date.
    pub daily: ShadeAverages,
    /// Rows within the high-temperature hours.
    pub high_temp_hours: ShadeAverages,
}

impl ShadeStats {
    /// Returns `true` if every statistic is `None`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A detected tree after shading and borough enrichment, ready for
/// census matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadedTree {
    pub detected: DetectedTree,
    pub shade: ShadeStats,
    pub borough: Option<BoroughInfo>,
}

/// The nearest-census outcome for one detected tree within a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub detected: DetectedTree,
    /// Claimed census tree. `None` when another detected tree was closer
    /// to the same census tree.
    pub census: Option<CensusTree>,
    /// Euclidean distance in degrees to the nearest census tree.
    pub distance: f64,
    pub is_nearest: bool,
    pub has_census_id: bool,
    /// Census location for winners, predicted location otherwise.
    pub updated_location: LonLat,
}

/// The enriched output record, one per detected tree.
///
/// Field names match the published `GeoJSON` properties. The struct is
/// flat so the same serialization feeds both `GeoJSON` properties and
/// CSV rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(rename = "Tree_CountID")]
    pub tree_count_id: i64,
    #[serde(rename = "Tile_id")]
    pub tile_id: String,
    #[serde(rename = "Recorded Year")]
    pub recorded_year: i32,
    #[serde(rename = "TopofCanopyHeight")]
    pub top_of_canopy_height: f64,
    #[serde(rename = "CanopyVolume")]
    pub canopy_volume: f64,
    #[serde(rename = "CanopyArea")]
    pub canopy_area: f64,
    #[serde(rename = "InPark")]
    pub in_park: bool,
    #[serde(rename = "GroundHeight")]
    pub ground_height: f64,
    #[serde(rename = "FoliageHeight")]
    pub foliage_height: f64,
    #[serde(rename = "BoroCode")]
    pub boro_code: Option<String>,
    #[serde(rename = "BoroName")]
    pub boro_name: Option<String>,

    #[serde(rename = "TreeShadow_PointCount")]
    pub tree_shadow_point_count: Option<f64>,
    #[serde(rename = "RelNoon_ShadedArea")]
    pub rel_noon_shaded_area: Option<f64>,
    #[serde(rename = "RelNoon_ShadedArea_Ground")]
    pub rel_noon_shaded_area_ground: Option<f64>,
    #[serde(rename = "RelNoon_Perc_Canopy_StreetShade")]
    pub rel_noon_perc_canopy_street_shade: Option<f64>,
    #[serde(rename = "RelNoon_Perc_Canopy_InShade")]
    pub rel_noon_perc_canopy_in_shade: Option<f64>,
    #[serde(rename = "DailyAvg_ShadedArea")]
    pub daily_avg_shaded_area: Option<f64>,
    #[serde(rename = "DailyAvg_ShadedArea_Ground")]
    pub daily_avg_shaded_area_ground: Option<f64>,
    #[serde(rename = "DailyAvg_Perc_Canopy_StreetShade")]
    pub daily_avg_perc_canopy_street_shade: Option<f64>,
    #[serde(rename = "DailyAvg_Perc_Canopy_InShade")]
    pub daily_avg_perc_canopy_in_shade: Option<f64>,
    #[serde(rename = "HighTempHours_Avg_ShadedArea")]
    pub high_temp_avg_shaded_area: Option<f64>,
    #[serde(rename = "HighTempHours_Avg_ShadedArea_Ground")]
    pub high_temp_avg_shaded_area_ground: Option<f64>,
    #[serde(rename = "HighTempHours_Avg_Perc_Canopy_StreetShade")]
    pub high_temp_avg_perc_canopy_street_shade: Option<f64>,
    #[serde(rename = "HighTempHours_Avg_Perc_Canopy_InShade")]
    pub high_temp_avg_perc_canopy_in_shade: Option<f64>,

    /// Latitude of [`Self::updated_location`].
    #[serde(rename = "Predicted Latitude")]
    pub predicted_latitude: f64,
    /// Longitude of [`Self::updated_location`].
    #[serde(rename = "Predicted Longitude")]
    pub predicted_longitude: f64,
    #[serde(rename = "Distance_to_census_location")]
    pub distance: Option<f64>,
    #[serde(rename = "isNearest")]
    pub is_nearest: bool,
    #[serde(rename = "hasTreeCensusID")]
    pub has_census_id: bool,

    #[serde(rename = "Census_id")]
    pub census_id: Option<i64>,
    #[serde(rename = "Census Latitude")]
    pub census_latitude: Option<f64>,
    #[serde(rename = "Census Longitude")]
    pub census_longitude: Option<f64>,
    #[serde(rename = "Spc_latin")]
    pub spc_latin: Option<String>,
    #[serde(rename = "Spc_common")]
    pub spc_common: Option<String>,
    #[serde(rename = "Tree_dbh")]
    pub tree_dbh: Option<f64>,
    #[serde(rename = "Canopy_radius")]
    pub canopy_radius: Option<f64>,
    #[serde(rename = "Curb_loc")]
    pub curb_loc: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Health")]
    pub health: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Zipcode")]
    pub zipcode: Option<String>,
    #[serde(rename = "CensusBoroName")]
    pub census_boro_name: Option<String>,

    /// Output point geometry. Never null.
    #[serde(skip)]
    pub updated_location: LonLat,
}

impl EnrichedRecord {
    /// The census point, present only for records that won a census tree.
    #[must_use]
    pub fn census_point(&self) -> Option<LonLat> {
        Some(LonLat::new(self.census_longitude?, self.census_latitude?))
    }
}
