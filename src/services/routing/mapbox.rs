//! Mapbox Directions client
//!
//! API documentation:
//! https://docs.mapbox.com/api/navigation/directions/
//!
//! The access token travels as a query parameter.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::http::send_for_body;
use super::DirectionsProvider;
use crate::defaults::DEFAULT_MAPBOX_URL;
use crate::error::RoutingError;
use crate::types::{GeoPoint, ProviderRoute};

pub struct MapboxProvider {
    client: Client,
    base_url: String,
}

impl MapboxProvider {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_MAPBOX_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn directions_url(&self, origin: &GeoPoint, destination: &GeoPoint, api_key: &str) -> String {
        format!(
            "{}/directions/v5/mapbox/driving/{},{};{},{}?geometries=geojson&overview=full&access_token={}",
            self.base_url,
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat,
            urlencoding::encode(api_key)
        )
    }
}

#[async_trait]
impl DirectionsProvider for MapboxProvider {
    async fn fetch_route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        api_key: &str,
    ) -> Result<ProviderRoute, RoutingError> {
        debug!("Requesting Mapbox route {} -> {}", origin, destination);

        let request = self.client.get(self.directions_url(origin, destination, api_key));
        let body = send_for_body(request).await?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "mapbox"
    }
}

/// Parse a Mapbox directions response into a validated route
pub fn parse_response(body: &str) -> Result<ProviderRoute, RoutingError> {
    let response: DirectionsResponse = serde_json::from_str(body)
        .map_err(|e| RoutingError::PermanentProvider(format!("malformed Mapbox response: {}", e)))?;

    let route = response.routes.into_iter().next().ok_or_else(|| {
        RoutingError::PermanentProvider(format!(
            "Mapbox returned no routes (code {})",
            response.code.as_deref().unwrap_or("unknown")
        ))
    })?;

    ProviderRoute::from_geojson(&route.geometry.coordinates, route.distance, route.duration)
}

// Mapbox API types

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    geometry: LineString,
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "geometry": {"type": "LineString", "coordinates": [[-118.2437, 34.0522], [-118.25, 34.06]]},
                "distance": 1609.344,
                "duration": 120.0
            }]
        }"#;

        let route = parse_response(body).unwrap();
        assert_eq!(route.coordinates.len(), 2);
        assert_eq!(route.distance_meters, 1609.344);
        assert_eq!(route.duration_seconds, 120.0);
    }

    #[test]
    fn test_parse_no_route_code() {
        let err = parse_response(r#"{"code":"NoRoute","routes":[]}"#).unwrap_err();

        match err {
            RoutingError::PermanentProvider(message) => assert!(message.contains("NoRoute")),
            other => panic!("expected permanent error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_distance_is_permanent() {
        let body = r#"{"routes":[{"geometry":{"coordinates":[[0.0,0.0]]},"duration":1.0}]}"#;
        assert!(matches!(parse_response(body), Err(RoutingError::PermanentProvider(_))));
    }

    #[test]
    fn test_directions_url_encodes_token() {
        let provider = MapboxProvider::new(Some("http://mapbox.local"), Duration::from_secs(5)).unwrap();
        let url = provider.directions_url(
            &GeoPoint { lat: 40.5, lng: -74.25 },
            &GeoPoint { lat: 34.5, lng: -118.5 },
            "pk.a b/c",
        );

        assert_eq!(
            url,
            "http://mapbox.local/directions/v5/mapbox/driving/-74.25,40.5;-118.5,34.5?geometries=geojson&overview=full&access_token=pk.a%20b%2Fc"
        );
    }
}
