//! Geographic point type

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// A WGS84 position. Immutable once validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a validated point
    pub fn new(lat: f64, lng: f64) -> Result<Self, RoutingError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check that both components are finite and within WGS84 bounds.
    ///
    /// Points arriving through serde skip `new`, so handlers call this
    /// before any math runs.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(RoutingError::InvalidArgument(format!(
                "non-finite coordinate ({}, {})",
                self.lat, self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(RoutingError::InvalidArgument(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(RoutingError::InvalidArgument(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// GeoJSON order
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Build from a GeoJSON `[lng, lat]` pair
    pub fn from_lng_lat(pair: [f64; 2]) -> Result<Self, RoutingError> {
        Self::new(pair[1], pair[0])
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_valid_point() {
        let p = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert_eq!(p.lat, 40.7128);
        assert_eq!(p.lng, -74.0060);
    }

    #[test]
    fn test_new_accepts_bounds() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_new_rejects_nan() {
        let err = GeoPoint::new(f64::NAN, 0.0).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidArgument(_)));
    }

    #[test]
    fn test_new_rejects_infinite_longitude() {
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.1).is_err());
    }

    #[test]
    fn test_deserialized_point_must_be_validated() {
        let p: GeoPoint = serde_json::from_str(r#"{"lat":123.0,"lng":14.0}"#).unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_geojson_order_round_trip() {
        let p = GeoPoint::new(50.0755, 14.4378).unwrap();
        let pair = p.to_lng_lat();
        assert_eq!(pair, [14.4378, 50.0755]);
        assert_eq!(GeoPoint::from_lng_lat(pair).unwrap(), p);
    }
}
