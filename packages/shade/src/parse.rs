//! Shading CSV parsing.
//!
//! Rows that fail to parse are logged and skipped; only an unreadable
//! header row fails the whole file.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use treefolio_tree_models::ShadeSample;

use crate::ShadeError;

/// Columns every shading CSV must carry.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "DateTime_ISO",
    "Sun_Amplitude",
    "Shadow_Area",
    "ShadowArea_Ground",
    "Perc_Canopy_StreetShade",
    "Perc_Canopy_InShade",
    "TreeShadow_PointCount",
];

#[derive(Debug, Deserialize)]
struct ShadeRow {
    #[serde(rename = "DateTime_ISO")]
    date_time: String,
    #[serde(rename = "Sun_Amplitude")]
    sun_amplitude: f64,
    #[serde(rename = "Shadow_Area")]
    shadow_area: f64,
    #[serde(rename = "ShadowArea_Ground")]
    shadow_area_ground: f64,
    #[serde(rename = "Perc_Canopy_StreetShade")]
    pct_canopy_street_shade: f64,
    #[serde(rename = "Perc_Canopy_InShade")]
    pct_canopy_in_shade: f64,
    #[serde(rename = "TreeShadow_PointCount")]
    tree_shadow_point_count: i64,
}

/// Parses a shading CSV into samples.
///
/// # Errors
///
/// Returns [`ShadeError`] if the header row cannot be read or lacks a
/// required column.
pub fn parse_shade_csv(bytes: &[u8]) -> Result<Vec<ShadeSample>, ShadeError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(ShadeError::MissingColumn {
                column: (*column).to_string(),
            });
        }
    }

    let mut samples = Vec::new();
    for (line, result) in reader.deserialize::<ShadeRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping malformed shading row {}: {e}", line + 2);
                continue;
            }
        };

        let Some(timestamp) = parse_timestamp(&row.date_time) else {
            log::warn!(
                "Skipping shading row {} with unparseable timestamp {:?}",
                line + 2,
                row.date_time
            );
            continue;
        };

        samples.push(ShadeSample {
            timestamp,
            sun_amplitude: row.sun_amplitude,
            shadow_area: row.shadow_area,
            shadow_area_ground: row.shadow_area_ground,
            pct_canopy_street_shade: row.pct_canopy_street_shade,
            pct_canopy_in_shade: row.pct_canopy_in_shade,
            tree_shadow_point_count: row.tree_shadow_point_count,
        });
    }

    Ok(samples)
}

/// Parses an ISO 8601 timestamp into wall-clock time.
///
/// Offset-qualified timestamps keep their local wall-clock time so that
/// the date and hour match what the simulation recorded.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    const HEADER: &str = "DateTime_ISO,Sun_Amplitude,Shadow_Area,ShadowArea_Ground,\
                          Perc_Canopy_StreetShade,Perc_Canopy_InShade,TreeShadow_PointCount";

    #[test]
    fn parses_rows() {
        let csv = format!(
            "{HEADER}\n\
             2017-06-21T12:00:00,70.5,12.0,8.0,40.0,20.0,150\n\
             2017-06-21T13:00:00,68.0,13.0,9.0,41.0,21.0,160\n"
        );
        let samples = parse_shade_csv(csv.as_bytes()).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0].sun_amplitude - 70.5).abs() < f64::EPSILON);
        assert_eq!(samples[1].tree_shadow_point_count, 160);
        assert_eq!(samples[1].timestamp.hour(), 13);
    }

    #[test]
    fn skips_malformed_rows() {
        let csv = format!(
            "{HEADER}\n\
             2017-06-21T12:00:00,not-a-number,12.0,8.0,40.0,20.0,150\n\
             garbage,70.0,12.0,8.0,40.0,20.0,150\n\
             2017-06-21T14:00:00,60.0,11.0,7.0,39.0,19.0,140\n"
        );
        let samples = parse_shade_csv(csv.as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp.hour(), 14);
    }

    #[test]
    fn ignores_extra_columns() {
        let csv = format!(
            "Index,{HEADER},Sun_Azimuth\n\
             0,2017-06-21 09:30:00,40.0,12.0,8.0,40.0,20.0,150,120.0\n"
        );
        let samples = parse_shade_csv(csv.as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "DateTime_ISO,Sun_Amplitude\n2017-06-21T12:00:00,70.0\n";
        let err = parse_shade_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ShadeError::MissingColumn { .. }));
    }

    #[test]
    fn offset_timestamps_keep_local_time() {
        let ts = parse_timestamp("2017-06-21T12:30:00-04:00").unwrap();
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.to_string(), "2017-06-21 12:30:00");

        let ts = parse_timestamp("2017-06-21 23:00:00-04:00").unwrap();
        assert_eq!(ts.to_string(), "2017-06-21 23:00:00");
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(parse_timestamp("June 21st").is_none());
    }
}
