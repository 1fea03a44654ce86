//! Route types

use serde::{Deserialize, Serialize};

use super::GeoPoint;
use crate::error::RoutingError;

/// Origin/destination pair. Identical points are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

impl RouteRequest {
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self { origin, destination }
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        self.origin.validate()?;
        self.destination.validate()
    }
}

/// Route handed back to callers, whether provider-backed or synthesized.
///
/// `path` always has at least two points, starts at the origin and ends at
/// the destination. `is_fallback` is the only signal that the numbers are a
/// straight-line estimate rather than provider data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub path: Vec<GeoPoint>,
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub is_fallback: bool,
}

/// Validated provider payload, still in provider units
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub coordinates: Vec<GeoPoint>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl ProviderRoute {
    /// Validate a GeoJSON line plus summary into a typed route.
    ///
    /// Any defect is a `PermanentProvider` error: retrying the same request
    /// would produce the same payload.
    pub fn from_geojson(
        coordinates: &[[f64; 2]],
        distance_meters: f64,
        duration_seconds: f64,
    ) -> Result<Self, RoutingError> {
        if coordinates.is_empty() {
            return Err(RoutingError::PermanentProvider("route geometry is empty".to_string()));
        }
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return Err(RoutingError::PermanentProvider(format!(
                "invalid route distance {}",
                distance_meters
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(RoutingError::PermanentProvider(format!(
                "invalid route duration {}",
                duration_seconds
            )));
        }

        let coordinates = coordinates
            .iter()
            .map(|pair| {
                GeoPoint::from_lng_lat(*pair)
                    .map_err(|e| RoutingError::PermanentProvider(format!("bad route vertex: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            coordinates,
            distance_meters,
            duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_result_serializes_to_camel_case() {
        let p = GeoPoint { lat: 40.0, lng: -74.0 };
        let result = RouteResult {
            path: vec![p, p],
            distance_miles: 0.0,
            duration_minutes: 0.0,
            is_fallback: true,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("distanceMiles"));
        assert!(json.contains("durationMinutes"));
        assert!(json.contains("\"isFallback\":true"));
    }

    #[test]
    fn test_route_request_deserializes() {
        let json = r#"{"origin":{"lat":40.7128,"lng":-74.006},"destination":{"lat":34.0522,"lng":-118.2437}}"#;
        let request: RouteRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.origin.lat, 40.7128);
        assert_eq!(request.destination.lng, -118.2437);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_route_request_validate_rejects_bad_destination() {
        let request = RouteRequest::new(
            GeoPoint { lat: 40.0, lng: -74.0 },
            GeoPoint { lat: 40.0, lng: 200.0 },
        );
        assert!(matches!(request.validate(), Err(RoutingError::InvalidArgument(_))));
    }

    #[test]
    fn test_provider_route_from_geojson() {
        let route = ProviderRoute::from_geojson(
            &[[-74.006, 40.7128], [-74.0, 40.72]],
            1200.0,
            180.0,
        )
        .unwrap();

        assert_eq!(route.coordinates.len(), 2);
        assert_eq!(route.coordinates[0], GeoPoint { lat: 40.7128, lng: -74.006 });
    }

    #[test]
    fn test_provider_route_rejects_empty_geometry() {
        let err = ProviderRoute::from_geojson(&[], 10.0, 10.0).unwrap_err();
        assert!(matches!(err, RoutingError::PermanentProvider(_)));
    }

    #[test]
    fn test_provider_route_rejects_negative_summary() {
        assert!(ProviderRoute::from_geojson(&[[0.0, 0.0]], -1.0, 10.0).is_err());
        assert!(ProviderRoute::from_geojson(&[[0.0, 0.0]], 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_provider_route_rejects_out_of_range_vertex() {
        let err = ProviderRoute::from_geojson(&[[0.0, 95.0]], 1.0, 1.0).unwrap_err();
        assert!(matches!(err, RoutingError::PermanentProvider(_)));
    }
}
