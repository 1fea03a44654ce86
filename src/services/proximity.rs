//! Proximity status classification
//!
//! Thresholds are in miles from the current position to the destination.
//! There is no hysteresis: a fix jittering around a boundary flips the
//! status back and forth.

use crate::error::RoutingError;
use crate::services::geo::haversine_distance_miles;
use crate::types::{GeoPoint, ProximityStatus};

/// Below this the driver has arrived
pub const ARRIVED_MILES: f64 = 0.1;
pub const NEAR_PICKUP_MILES: f64 = 0.2;
pub const APPROACHING_MILES: f64 = 5.0;

/// Classify a distance reading. Boundaries belong to the farther band.
pub fn classify(distance_miles: f64) -> ProximityStatus {
    if distance_miles < ARRIVED_MILES {
        ProximityStatus::Arrived
    } else if distance_miles < NEAR_PICKUP_MILES {
        ProximityStatus::NearPickup
    } else if distance_miles < APPROACHING_MILES {
        ProximityStatus::Approaching
    } else {
        ProximityStatus::Far
    }
}

/// Distance to destination and its status
pub fn classify_position(
    current: &GeoPoint,
    destination: &GeoPoint,
) -> Result<(f64, ProximityStatus), RoutingError> {
    let distance = haversine_distance_miles(current, destination)?;
    Ok((distance, classify(distance)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify(0.05), ProximityStatus::Arrived);
        assert_eq!(classify(0.15), ProximityStatus::NearPickup);
        assert_eq!(classify(1.0), ProximityStatus::Approaching);
        assert_eq!(classify(10.0), ProximityStatus::Far);
    }

    #[test]
    fn test_classify_boundaries_go_to_farther_band() {
        assert_eq!(classify(0.1), ProximityStatus::NearPickup);
        assert_eq!(classify(0.2), ProximityStatus::Approaching);
        assert_eq!(classify(5.0), ProximityStatus::Far);
    }

    #[test]
    fn test_classify_zero_is_arrived() {
        assert_eq!(classify(0.0), ProximityStatus::Arrived);
    }

    #[test]
    fn test_classify_position_at_destination() {
        let p = GeoPoint { lat: 34.0522, lng: -118.2437 };
        let (distance, status) = classify_position(&p, &p).unwrap();
        assert_eq!(distance, 0.0);
        assert_eq!(status, ProximityStatus::Arrived);
    }

    #[test]
    fn test_classify_position_across_town() {
        // Downtown LA to Santa Monica, roughly 14 miles
        let downtown = GeoPoint { lat: 34.0522, lng: -118.2437 };
        let santa_monica = GeoPoint { lat: 34.0195, lng: -118.4912 };
        let (distance, status) = classify_position(&downtown, &santa_monica).unwrap();

        assert!(distance > 10.0 && distance < 20.0, "got {}", distance);
        assert_eq!(status, ProximityStatus::Far);
    }

    #[test]
    fn test_classify_position_rejects_nan_fix() {
        let fix = GeoPoint { lat: f64::NAN, lng: 0.0 };
        let destination = GeoPoint { lat: 10.0, lng: 10.0 };
        assert!(matches!(
            classify_position(&fix, &destination),
            Err(RoutingError::InvalidArgument(_))
        ));
    }
}
