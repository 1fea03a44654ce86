//! openrouteservice directions client
//!
//! API documentation:
//! https://openrouteservice.org/dev/#/api-docs/v2/directions/{profile}/geojson/post
//!
//! The API key travels in the `Authorization` header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::send_for_body;
use super::DirectionsProvider;
use crate::defaults::DEFAULT_OPENROUTESERVICE_URL;
use crate::error::RoutingError;
use crate::types::{GeoPoint, ProviderRoute};

/// openrouteservice client
pub struct OpenRouteServiceProvider {
    client: Client,
    base_url: String,
}

impl OpenRouteServiceProvider {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_OPENROUTESERVICE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn directions_url(&self) -> String {
        format!("{}/v2/directions/driving-car/geojson", self.base_url)
    }

    fn build_request(origin: &GeoPoint, destination: &GeoPoint) -> DirectionsRequest {
        DirectionsRequest {
            coordinates: vec![origin.to_lng_lat(), destination.to_lng_lat()],
        }
    }
}

#[async_trait]
impl DirectionsProvider for OpenRouteServiceProvider {
    async fn fetch_route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        api_key: &str,
    ) -> Result<ProviderRoute, RoutingError> {
        debug!("Requesting openrouteservice route {} -> {}", origin, destination);

        let request = self
            .client
            .post(self.directions_url())
            .header(reqwest::header::AUTHORIZATION, api_key)
            .json(&Self::build_request(origin, destination));

        let body = send_for_body(request).await?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "openrouteservice"
    }
}

/// Parse a GeoJSON directions response into a validated route
pub fn parse_response(body: &str) -> Result<ProviderRoute, RoutingError> {
    let response: DirectionsResponse = serde_json::from_str(body)
        .map_err(|e| RoutingError::PermanentProvider(format!("malformed openrouteservice response: {}", e)))?;

    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::PermanentProvider("openrouteservice returned no routes".to_string()))?;

    ProviderRoute::from_geojson(
        &feature.geometry.coordinates,
        feature.properties.summary.distance,
        feature.properties.summary.duration,
    )
}

// openrouteservice API types

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    /// [lng, lat] pairs
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: LineString,
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    summary: Summary,
}

/// Both fields are omitted by the API when zero
#[derive(Debug, Deserialize)]
struct Summary {
    /// Meters
    #[serde(default)]
    distance: f64,
    /// Seconds
    #[serde(default)]
    duration: f64,
}
