//! Geographic calculations

use crate::defaults::DEFAULT_SPEED_MPH;
use crate::error::RoutingError;
use crate::types::GeoPoint;

/// Earth radius in miles
const EARTH_RADIUS_MILES: f64 = 3958.8;

const METERS_PER_MILE: f64 = 1609.344;

/// Calculate Haversine distance between two points in miles.
///
/// Both points are validated first; a non-finite or out-of-range
/// coordinate is an `InvalidArgument`, never a distance.
pub fn haversine_distance_miles(from: &GeoPoint, to: &GeoPoint) -> Result<f64, RoutingError> {
    from.validate()?;
    to.validate()?;

    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1.0 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    Ok(EARTH_RADIUS_MILES * c)
}

/// Estimate travel time in minutes at a constant speed
pub fn estimate_duration_minutes(distance_miles: f64, speed_mph: f64) -> Result<f64, RoutingError> {
    if !distance_miles.is_finite() || distance_miles < 0.0 {
        return Err(RoutingError::InvalidArgument(format!(
            "distance must be a non-negative finite number, got {}",
            distance_miles
        )));
    }
    if !speed_mph.is_finite() || speed_mph <= 0.0 {
        return Err(RoutingError::InvalidArgument(format!(
            "speed must be a positive finite number, got {}",
            speed_mph
        )));
    }

    Ok(distance_miles / speed_mph * 60.0)
}

/// Travel time at `DEFAULT_SPEED_MPH`
pub fn estimate_duration_default(distance_miles: f64) -> Result<f64, RoutingError> {
    estimate_duration_minutes(distance_miles, DEFAULT_SPEED_MPH)
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn seconds_to_minutes(seconds: f64) -> f64 {
    seconds / 60.0
}
