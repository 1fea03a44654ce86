//! Live navigation sessions
//!
//! A `NavigationSession` holds everything one driver's navigation needs:
//! the latest fix, the destination, the freshest route and the derived
//! proximity status. It is owned by exactly one task (`run_session`), which
//! feeds it location samples and timer-driven route refreshes, so no locking
//! is needed around its fields.
//!
//! Route refreshes carry a sequence number. A refresh that completes after a
//! newer one has already been applied is discarded. Only one refresh runs at
//! a time; timer ticks that land while one is outstanding are skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RoutingError;
use crate::services::geo::haversine_distance_miles;
use crate::services::proximity::classify_position;
use crate::services::routing::RouteEstimator;
use crate::types::{
    GeoPoint, LocationSample, NavigationEvent, ProximityStatus, RouteRequest, RouteResult,
    TripCompletion,
};

/// Distance and status derived from one fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityReading {
    pub distance_miles: f64,
    pub status: ProximityStatus,
}

/// State of one driver's navigation
#[derive(Debug, Clone)]
pub struct NavigationSession {
    id: Uuid,
    driver_id: Uuid,
    load_id: Option<String>,
    destination: Option<GeoPoint>,
    current_location: Option<GeoPoint>,
    latest_route: Option<RouteResult>,
    status: Option<ProximityStatus>,
    location_error: Option<String>,
    /// Last sequence number handed out by `next_route_request`
    issued_seq: u64,
    /// Sequence number of `latest_route`, 0 when none
    applied_seq: u64,
    travelled_miles: f64,
    started_at: DateTime<Utc>,
}

impl NavigationSession {
    pub fn new(id: Uuid, driver_id: Uuid, destination: GeoPoint, load_id: Option<String>) -> Self {
        Self {
            id,
            driver_id,
            load_id,
            destination: Some(destination),
            current_location: None,
            latest_route: None,
            status: None,
            location_error: None,
            issued_seq: 0,
            applied_seq: 0,
            travelled_miles: 0.0,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[cfg(test)]
    pub fn driver_id(&self) -> Uuid {
        self.driver_id
    }

    #[cfg(test)]
    pub fn destination(&self) -> Option<GeoPoint> {
        self.destination
    }

    pub fn current_location(&self) -> Option<GeoPoint> {
        self.current_location
    }

    #[cfg(test)]
    pub fn latest_route(&self) -> Option<&RouteResult> {
        self.latest_route.as_ref()
    }

    /// `None` until the first fix, and while the location source is failing
    #[cfg(test)]
    pub fn status(&self) -> Option<ProximityStatus> {
        self.status
    }

    #[cfg(test)]
    pub fn location_error(&self) -> Option<&str> {
        self.location_error.as_deref()
    }

    #[cfg(test)]
    pub fn travelled_miles(&self) -> f64 {
        self.travelled_miles
    }

    pub fn is_active(&self) -> bool {
        self.destination.is_some()
    }

    /// Record a fix and recompute proximity.
    ///
    /// Returns `Ok(None)` once the destination has been cleared; a stopped
    /// session never transitions again. An invalid fix is rejected with
    /// `InvalidArgument` and leaves the session untouched.
    pub fn record_location(&mut self, point: GeoPoint) -> Result<Option<ProximityReading>, RoutingError> {
        let Some(destination) = self.destination else {
            return Ok(None);
        };

        let (distance_miles, status) = classify_position(&point, &destination)?;
        let leg_miles = match self.current_location {
            Some(previous) => haversine_distance_miles(&previous, &point)?,
            None => 0.0,
        };

        self.travelled_miles += leg_miles;
        self.current_location = Some(point);
        self.location_error = None;
        self.status = Some(status);

        Ok(Some(ProximityReading { distance_miles, status }))
    }

    /// The location source failed; drop the status rather than guess one
    pub fn record_location_error(&mut self, reason: impl Into<String>) {
        self.location_error = Some(reason.into());
        self.status = None;
    }

    /// Issue a route request from the latest fix, tagged with a fresh
    /// sequence number
    pub fn next_route_request(&mut self) -> Option<(u64, RouteRequest)> {
        let origin = self.current_location?;
        let destination = self.destination?;

        self.issued_seq += 1;
        Some((self.issued_seq, RouteRequest::new(origin, destination)))
    }

    /// Apply a refreshed route unless a newer one is already in place
    pub fn apply_route(&mut self, seq: u64, route: RouteResult) -> bool {
        if !self.is_active() || seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.latest_route = Some(route);
        true
    }

    /// Build the trip record and clear the destination
    pub fn complete(&mut self, now: DateTime<Utc>) -> Option<TripCompletion> {
        let destination = self.destination.take()?;
        let elapsed = (now - self.started_at).num_milliseconds().max(0) as f64;

        Some(TripCompletion {
            session_id: self.id,
            driver_id: self.driver_id,
            load_id: self.load_id.clone(),
            destination,
            total_distance_miles: self.travelled_miles,
            duration_minutes: elapsed / 60_000.0,
            completed_at: now,
        })
    }

    /// Clear the destination so no further transitions occur
    pub fn stop(&mut self) {
        self.destination = None;
    }
}

/// Why `run_session` returned
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Arrived(TripCompletion),
    /// Cancelled by the caller
    Stopped,
    /// The location sample channel closed
    SourceClosed,
}

type RefreshResult = (u64, Result<RouteResult, RoutingError>);

/// Drive a session until arrival, cancellation, or the end of the sample stream.
///
/// Routes are refreshed on the first fix and then every `refresh_every`.
/// Each refresh runs as its own task under a child of `cancel`, so stopping
/// the session abandons any in-flight directions request.
pub async fn run_session(
    mut session: NavigationSession,
    estimator: Arc<RouteEstimator>,
    mut samples: mpsc::Receiver<LocationSample>,
    events: mpsc::Sender<NavigationEvent>,
    cancel: CancellationToken,
    refresh_every: Duration,
) -> SessionOutcome {
    let session_id = session.id();
    let refresh_cancel = cancel.child_token();
    let (route_tx, mut route_rx) = mpsc::channel::<RefreshResult>(8);
    // At most one refresh per session; ticks are skipped while it runs
    let mut in_flight: Option<u64> = None;

    let mut refresh = tokio::time::interval(refresh_every);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the first fix triggers that refresh instead
    refresh.tick().await;

    info!("Navigation session {} started", session_id);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                session.stop();
                refresh_cancel.cancel();
                info!("Navigation session {} stopped", session_id);
                return SessionOutcome::Stopped;
            }
            sample = samples.recv() => {
                let Some(sample) = sample else {
                    session.stop();
                    refresh_cancel.cancel();
                    info!("Navigation session {} lost its location source", session_id);
                    return SessionOutcome::SourceClosed;
                };

                match sample {
                    LocationSample::Fix(point) => {
                        let first_fix = session.current_location().is_none();
                        let reading = match session.record_location(point) {
                            Ok(Some(reading)) => reading,
                            Ok(None) => continue,
                            Err(e) => {
                                warn!("Session {}: rejected fix {}: {}", session_id, point, e);
                                continue;
                            }
                        };

                        debug!(
                            "Session {}: {:.2} mi to destination ({})",
                            session_id, reading.distance_miles, reading.status.as_str()
                        );
                        emit(&events, NavigationEvent::Status {
                            status: reading.status,
                            distance_miles: reading.distance_miles,
                            location: point,
                        }).await;

                        if reading.status.is_terminal() {
                            refresh_cancel.cancel();
                            if let Some(trip) = session.complete(Utc::now()) {
                                info!(
                                    "Navigation session {} arrived after {:.1} mi",
                                    session_id, trip.total_distance_miles
                                );
                                emit(&events, NavigationEvent::Completed { trip: trip.clone() }).await;
                                return SessionOutcome::Arrived(trip);
                            }
                        }

                        if first_fix && in_flight.is_none() {
                            in_flight = spawn_refresh(&mut session, &estimator, &route_tx, &refresh_cancel);
                        }
                    }
                    LocationSample::Unavailable(reason) => {
                        warn!("Session {}: location unavailable: {}", session_id, reason);
                        session.record_location_error(reason.clone());
                        emit(&events, NavigationEvent::LocationError { message: reason }).await;
                    }
                }
            }
            _ = refresh.tick() => {
                match in_flight {
                    Some(seq) => debug!("Session {}: refresh #{} still running, skipping tick", session_id, seq),
                    None => in_flight = spawn_refresh(&mut session, &estimator, &route_tx, &refresh_cancel),
                }
            }
            Some((seq, outcome)) = route_rx.recv() => {
                if in_flight == Some(seq) {
                    in_flight = None;
                }
                match outcome {
                    Ok(route) => {
                        if session.apply_route(seq, route.clone()) {
                            emit(&events, NavigationEvent::RouteUpdated { sequence: seq, route }).await;
                        } else {
                            debug!("Session {}: discarding stale route #{}", session_id, seq);
                        }
                    }
                    Err(RoutingError::Cancelled) => {}
                    Err(e) => warn!("Session {}: route refresh #{} failed: {}", session_id, seq, e),
                }
            }
        }
    }
}

/// Start a refresh from the latest fix, returning its sequence number
fn spawn_refresh(
    session: &mut NavigationSession,
    estimator: &Arc<RouteEstimator>,
    results: &mpsc::Sender<RefreshResult>,
    cancel: &CancellationToken,
) -> Option<u64> {
    let (seq, request) = session.next_route_request()?;

    let estimator = Arc::clone(estimator);
    let results = results.clone();
    let cancel = cancel.clone();

    tokio::spawn(async move {
        let outcome = estimator.estimate_cancellable(&request, &cancel).await;
        let _ = results.send((seq, outcome)).await;
    });

    Some(seq)
}

async fn emit(events: &mpsc::Sender<NavigationEvent>, event: NavigationEvent) {
    if events.send(event).await.is_err() {
        debug!("Navigation event dropped, listener gone");
    }
}
