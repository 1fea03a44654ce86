//! Live navigation types
//!
//! Request/response payloads for the `loadrush.navigation.*` subjects and the
//! events a running session publishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GeoPoint, RouteResult};

// ==========================================================================
// Proximity
// ==========================================================================

/// Coarse distance-to-destination label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityStatus {
    /// Five miles or more away
    Far,
    Approaching,
    /// Inside the pickup area but not yet within arrival tolerance
    NearPickup,
    Arrived,
}

impl ProximityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProximityStatus::Far => "far",
            ProximityStatus::Approaching => "approaching",
            ProximityStatus::NearPickup => "near_pickup",
            ProximityStatus::Arrived => "arrived",
        }
    }

    /// Arrival ends the session
    pub const fn is_terminal(self) -> bool {
        matches!(self, ProximityStatus::Arrived)
    }
}

// ==========================================================================
// Location samples
// ==========================================================================

/// One reading from the device location source
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSample {
    Fix(GeoPoint),
    /// Permission denied, no fix, sensor failure...
    Unavailable(String),
}

// ==========================================================================
// Trip completion
// ==========================================================================

/// Record handed to the trip-persistence collaborator on arrival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripCompletion {
    pub session_id: Uuid,
    pub driver_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_id: Option<String>,
    pub destination: GeoPoint,
    /// Miles actually driven, summed over successive location fixes
    pub total_distance_miles: f64,
    pub duration_minutes: f64,
    pub completed_at: DateTime<Utc>,
}

// ==========================================================================
// Session events
// ==========================================================================

/// Event emitted by a running navigation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NavigationEvent {
    /// Proximity recomputed from a new fix
    #[serde(rename_all = "camelCase")]
    Status {
        status: ProximityStatus,
        distance_miles: f64,
        location: GeoPoint,
    },
    /// A fresher route was applied
    #[serde(rename_all = "camelCase")]
    RouteUpdated {
        sequence: u64,
        route: RouteResult,
    },
    /// The location source failed; no status is guessed
    #[serde(rename_all = "camelCase")]
    LocationError {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        trip: TripCompletion,
    },
}

/// Envelope published on `loadrush.navigation.status.{sessionId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStatusUpdate {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: NavigationEvent,
}

impl NavigationStatusUpdate {
    pub fn new(session_id: Uuid, event: NavigationEvent) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            event,
        }
    }
}

// ==========================================================================
// NATS payloads
// ==========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNavigationRequest {
    pub driver_id: Uuid,
    pub destination: GeoPoint,
    #[serde(default)]
    pub load_id: Option<String>,
    /// Optional first fix, saves waiting for the device's first callback
    #[serde(default)]
    pub origin: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNavigationResponse {
    pub session_id: Uuid,
}

/// Either a fix or a location-source error must be present
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateRequest {
    pub session_id: Uuid,
    pub driver_id: Uuid,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LocationUpdateRequest {
    /// Convert into a sample; `None` when the payload carries neither field
    pub fn into_sample(self) -> Option<LocationSample> {
        match (self.location, self.error) {
            (Some(point), _) => Some(LocationSample::Fix(point)),
            (None, Some(message)) => Some(LocationSample::Unavailable(message)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopNavigationRequest {
    pub session_id: Uuid,
    pub driver_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopNavigationResponse {
    pub stopped: bool,
}
