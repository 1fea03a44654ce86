//! Straight-line fallback route
//!
//! Served whenever the directions provider is unconfigured, failing, or out
//! of retries. The path is deliberately just `[origin, destination]`.

use tracing::warn;

use crate::error::RoutingError;
use crate::services::geo::{estimate_duration_default, estimate_duration_minutes, haversine_distance_miles};
use crate::types::{GeoPoint, RouteResult};

/// Synthesize a two-point route.
///
/// Only invalid coordinates are rejected; a bad speed falls back to the
/// default speed.
pub fn fallback_route(
    origin: GeoPoint,
    destination: GeoPoint,
    speed_mph: f64,
) -> Result<RouteResult, RoutingError> {
    let distance_miles = haversine_distance_miles(&origin, &destination)?;

    let duration_minutes = estimate_duration_minutes(distance_miles, speed_mph)
        .or_else(|e| {
            warn!("Configured speed rejected ({}), using default speed", e);
            estimate_duration_default(distance_miles)
        })
        .unwrap_or(0.0);

    Ok(RouteResult {
        path: vec![origin, destination],
        distance_miles,
        duration_minutes,
        is_fallback: true,
    })
}
