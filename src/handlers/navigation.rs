//! Live navigation message handlers
//!
//! `loadrush.navigation.start` spawns a session task, `...location` feeds it
//! samples, `...stop` cancels it. Session events are funnelled through one
//! channel to `publish_updates`, which fans them out to NATS.

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::RoutingError;
use crate::services::navigation::{run_session, NavigationSession};
use crate::services::routing::RouteEstimator;
use crate::services::sessions::{SessionError, SessionRegistry};
use crate::types::{
    ErrorResponse, LocationSample, LocationUpdateRequest, LocationUpdateResponse, NavigationEvent,
    NavigationStatusUpdate, Request, StartNavigationRequest, StartNavigationResponse,
    StopNavigationRequest, StopNavigationResponse, SuccessResponse,
};

pub const STATUS_SUBJECT_PREFIX: &str = "loadrush.navigation.status";
pub const TRIP_COMPLETED_SUBJECT: &str = "loadrush.trip.completed";

/// Location samples buffered per session before updates are refused
const SAMPLE_QUEUE_SIZE: usize = 32;
const EVENT_QUEUE_SIZE: usize = 32;

/// Why a location update was refused
#[derive(Debug, Error)]
pub enum LocationUpdateError {
    #[error(transparent)]
    Invalid(#[from] RoutingError),
    #[error("either location or error must be set")]
    Empty,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LocationUpdateError {
    pub fn code(&self) -> &'static str {
        match self {
            LocationUpdateError::Invalid(e) => e.code(),
            LocationUpdateError::Empty => "INVALID_REQUEST",
            LocationUpdateError::Session(e) => e.code(),
        }
    }
}

/// Shared state for the navigation handlers
pub struct NavigationContext {
    estimator: Arc<RouteEstimator>,
    registry: SessionRegistry,
    refresh_every: Duration,
    updates: mpsc::Sender<NavigationStatusUpdate>,
}

impl NavigationContext {
    pub fn new(
        estimator: Arc<RouteEstimator>,
        refresh_every: Duration,
        updates: mpsc::Sender<NavigationStatusUpdate>,
    ) -> Self {
        Self {
            estimator,
            registry: SessionRegistry::default(),
            refresh_every,
            updates,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Validate the request and spawn the session task
    pub fn start(&self, request: StartNavigationRequest) -> Result<Uuid, RoutingError> {
        request.destination.validate()?;
        if let Some(origin) = request.origin {
            origin.validate()?;
        }

        let session_id = Uuid::new_v4();
        let session = NavigationSession::new(
            session_id,
            request.driver_id,
            request.destination,
            request.load_id,
        );

        let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_QUEUE_SIZE);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let cancel = CancellationToken::new();

        if let Some(origin) = request.origin {
            // Fresh channel, cannot be full
            let _ = samples_tx.try_send(LocationSample::Fix(origin));
        }

        let guard = self.registry.register(session_id, request.driver_id, samples_tx, cancel.clone());
        let estimator = Arc::clone(&self.estimator);
        let updates = self.updates.clone();
        let refresh_every = self.refresh_every;

        tokio::spawn(async move {
            let _guard = guard;
            let (outcome, ()) = tokio::join!(
                run_session(session, estimator, samples_rx, events_tx, cancel, refresh_every),
                forward_events(session_id, events_rx, updates),
            );
            debug!("Navigation session {} finished: {:?}", session_id, outcome);
        });

        info!("Started navigation session {} for driver {}", session_id, request.driver_id);
        Ok(session_id)
    }

    /// Queue a location update for its session
    pub fn push_location(&self, request: LocationUpdateRequest) -> Result<(), LocationUpdateError> {
        if let Some(location) = request.location {
            location.validate()?;
        }

        let session_id = request.session_id;
        let driver_id = request.driver_id;
        let sample = request.into_sample().ok_or(LocationUpdateError::Empty)?;

        self.registry.push_sample(&session_id, driver_id, sample)?;
        Ok(())
    }

    /// Stop a session owned by the caller
    pub fn stop(&self, request: &StopNavigationRequest) -> Result<bool, SessionError> {
        self.registry.stop(&request.session_id, request.driver_id)
    }
}

async fn forward_events(
    session_id: Uuid,
    mut events: mpsc::Receiver<NavigationEvent>,
    updates: mpsc::Sender<NavigationStatusUpdate>,
) {
    while let Some(event) = events.recv().await {
        if updates.send(NavigationStatusUpdate::new(session_id, event)).await.is_err() {
            warn!("Navigation update publisher gone, dropping events for {}", session_id);
            break;
        }
    }
}

/// Publish session events; arrivals also go to the trip-persistence subject
pub async fn publish_updates(client: Client, mut updates: mpsc::Receiver<NavigationStatusUpdate>) -> Result<()> {
    while let Some(update) = updates.recv().await {
        let subject = format!("{}.{}", STATUS_SUBJECT_PREFIX, update.session_id);
        let payload = serde_json::to_vec(&update)?;
        if let Err(e) = client.publish(subject, payload.into()).await {
            error!("Failed to publish navigation status: {}", e);
        }

        if let NavigationEvent::Completed { trip } = &update.event {
            let payload = serde_json::to_vec(trip)?;
            match client.publish(TRIP_COMPLETED_SUBJECT, payload.into()).await {
                Ok(()) => info!("Trip completion for session {} published", trip.session_id),
                Err(e) => error!("Failed to publish trip completion: {}", e),
            }
        }
    }

    Ok(())
}

/// Handle navigation.start requests
pub async fn handle_start(client: Client, mut subscriber: Subscriber, ctx: Arc<NavigationContext>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<StartNavigationRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse navigation start request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match ctx.start(request.payload) {
            Ok(session_id) => {
                let success = SuccessResponse::new(request.id, StartNavigationResponse { session_id });
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle navigation.location requests
pub async fn handle_location(client: Client, mut subscriber: Subscriber, ctx: Arc<NavigationContext>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<LocationUpdateRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse location update: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match ctx.push_location(request.payload) {
            Ok(()) => {
                let success = SuccessResponse::new(request.id, LocationUpdateResponse { accepted: true });
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                debug!("Location update {} refused: {}", request.id, e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle navigation.stop requests
pub async fn handle_stop(client: Client, mut subscriber: Subscriber, ctx: Arc<NavigationContext>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<StopNavigationRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse navigation stop request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match ctx.stop(&request.payload) {
            Ok(stopped) => {
                if stopped {
                    info!("Navigation session {} stopped by driver", request.payload.session_id);
                }
                let success = SuccessResponse::new(request.id, StopNavigationResponse { stopped });
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                warn!("Refused to stop session {}: {}", request.payload.session_id, e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
