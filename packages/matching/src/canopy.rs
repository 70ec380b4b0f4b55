//! Allometric canopy estimate from trunk diameter.

const INCHES_PER_FOOT: f64 = 12.0;
const FEET_PER_METER: f64 = 3.28;
const CANOPY_DIAMETER_INTERCEPT: f64 = 7.0;
const CANOPY_DIAMETER_SLOPE: f64 = 28.2;

/// Estimated canopy radius in meters for a trunk diameter at breast
/// height given in inches.
#[must_use]
pub fn canopy_radius(dbh_inches: f64) -> f64 {
    let dbh_m = dbh_inches / INCHES_PER_FOOT / FEET_PER_METER;
    let trunk_area = std::f64::consts::PI * (dbh_m / 2.0).powi(2);
    let diameter = CANOPY_DIAMETER_SLOPE.mul_add(trunk_area, CANOPY_DIAMETER_INTERCEPT);
    diameter / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_inch_trunk() {
        assert!((canopy_radius(10.0) - 4.217).abs() < 1e-3);
    }

    #[test]
    fn zero_diameter_is_intercept_only() {
        assert!((canopy_radius(0.0) - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn grows_with_diameter() {
        assert!(canopy_radius(30.0) > canopy_radius(10.0));
    }
}
