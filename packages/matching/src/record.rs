//! Assembly of the enriched output record.

use treefolio_tree_models::{
    BoroughInfo, CensusTree, DetectedTree, EnrichedRecord, MatchCandidate, ShadeStats,
};

use crate::canopy_radius;

/// Builds the output record for one detected tree.
///
/// `candidate` is `None` when the tile had no census coverage. A record
/// only carries census fields if its candidate won the census tree; all
/// other records get `fallback_canopy_radius` (the radius of the tile's
/// mean census diameter, `None` without coverage).
#[must_use]
pub fn build(
    detected: &DetectedTree,
    shade: &ShadeStats,
    borough: Option<&BoroughInfo>,
    candidate: Option<&MatchCandidate>,
    fallback_canopy_radius: Option<f64>,
) -> EnrichedRecord {
    let census = candidate
        .filter(|c| c.has_census_id)
        .and_then(|c| c.census.as_ref());

    let updated_location = match (candidate, census) {
        (Some(c), Some(_)) => c.updated_location,
        _ => detected.predicted_location,
    };

    let mut record = EnrichedRecord {
        tree_count_id: detected.tree_count_id,
        tile_id: detected.tile_id.clone(),
        recorded_year: detected.recorded_year,
        top_of_canopy_height: detected.foliage_height,
        canopy_volume: detected.canopy_volume,
        canopy_area: detected.canopy_area,
        in_park: detected.in_park,
        ground_height: detected.ground_z,
        foliage_height: detected.foliage_height,
        boro_code: borough.map(|b| b.code.clone()),
        boro_name: borough.map(|b| b.name.clone()),

        tree_shadow_point_count: shade.peak.tree_shadow_point_count,
        rel_noon_shaded_area: shade.peak.shaded_area,
        rel_noon_shaded_area_ground: shade.peak.shaded_area_ground,
        rel_noon_perc_canopy_street_shade: shade.peak.perc_canopy_street_shade,
        rel_noon_perc_canopy_in_shade: shade.peak.perc_canopy_in_shade,
        daily_avg_shaded_area: shade.daily.shaded_area,
        daily_avg_shaded_area_ground: shade.daily.shaded_area_ground,
        daily_avg_perc_canopy_street_shade: shade.daily.perc_canopy_street_shade,
        daily_avg_perc_canopy_in_shade: shade.daily.perc_canopy_in_shade,
        high_temp_avg_shaded_area: shade.high_temp_hours.shaded_area,
        high_temp_avg_shaded_area_ground: shade.high_temp_hours.shaded_area_ground,
        high_temp_avg_perc_canopy_street_shade: shade.high_temp_hours.perc_canopy_street_shade,
        high_temp_avg_perc_canopy_in_shade: shade.high_temp_hours.perc_canopy_in_shade,

        predicted_latitude: updated_location.lat,
        predicted_longitude: updated_location.lon,
        distance: candidate.map(|c| c.distance),
        is_nearest: candidate.is_some_and(|c| c.is_nearest),
        has_census_id: census.is_some(),

        census_id: None,
        census_latitude: None,
        census_longitude: None,
        spc_latin: None,
        spc_common: None,
        tree_dbh: None,
        canopy_radius: fallback_canopy_radius,
        curb_loc: None,
        status: None,
        health: None,
        address: None,
        zipcode: None,
        census_boro_name: None,

        updated_location,
    };

    if let Some(census) = census {
        fill_census(&mut record, census);
    }

    record
}

fn fill_census(record: &mut EnrichedRecord, census: &CensusTree) {
    record.census_id = Some(census.tree_id);
    record.census_latitude = Some(census.location.lat);
    record.census_longitude = Some(census.location.lon);
    record.spc_latin.clone_from(&census.species_latin);
    record.spc_common.clone_from(&census.species_common);
    record.tree_dbh = Some(census.dbh);
    record.canopy_radius = Some(canopy_radius(census.dbh));
    record.curb_loc.clone_from(&census.curb_loc);
    record.status.clone_from(&census.status);
    record.health.clone_from(&census.health);
    record.address.clone_from(&census.address);
    record.zipcode.clone_from(&census.zipcode);
    record.census_boro_name.clone_from(&census.borough_name);
}
