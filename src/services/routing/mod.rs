//! Route estimation
//!
//! `RouteEstimator` asks a `DirectionsProvider` for a driving route, retries
//! transient failures with exponential backoff, and degrades to a straight
//! line estimate when the provider is unconfigured, broken or exhausted.
//! Callers with valid points always get a `RouteResult`; `is_fallback`
//! tells them which kind.

mod fallback;
mod http;
mod mapbox;
mod openroute;
mod retry;

pub use fallback::fallback_route;
pub use mapbox::MapboxProvider;
pub use openroute::OpenRouteServiceProvider;
pub use retry::{Decision, RetryPolicy};

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DirectionsConfig;
use crate::defaults::{DEFAULT_DIRECTIONS_TIMEOUT_SECS, DEFAULT_SPEED_MPH};
use crate::error::RoutingError;
use crate::services::geo::{meters_to_miles, seconds_to_minutes};
use crate::types::{GeoPoint, ProviderRoute, RouteRequest, RouteResult};

/// Directions provider abstraction (openrouteservice, Mapbox, test doubles)
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Fetch one driving route between two points
    async fn fetch_route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        api_key: &str,
    ) -> Result<ProviderRoute, RoutingError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Supported directions backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouteService,
    Mapbox,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouteservice" | "ors" => Ok(ProviderKind::OpenRouteService),
            "mapbox" => Ok(ProviderKind::Mapbox),
            other => anyhow::bail!("Unknown directions provider '{}' (expected openrouteservice or mapbox)", other),
        }
    }
}

/// Create the configured provider
pub fn create_provider(config: &DirectionsConfig) -> Result<Arc<dyn DirectionsProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let base_url = config.base_url.as_deref();

    let provider: Arc<dyn DirectionsProvider> = match config.provider {
        ProviderKind::OpenRouteService => Arc::new(OpenRouteServiceProvider::new(base_url, timeout)?),
        ProviderKind::Mapbox => Arc::new(MapboxProvider::new(base_url, timeout)?),
    };
    Ok(provider)
}

/// Provider call + retry/backoff + fallback
pub struct RouteEstimator {
    provider: Arc<dyn DirectionsProvider>,
    api_key: Option<String>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    speed_mph: f64,
}

impl RouteEstimator {
    pub fn new(provider: Arc<dyn DirectionsProvider>, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            policy: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(DEFAULT_DIRECTIONS_TIMEOUT_SECS),
            speed_mph: DEFAULT_SPEED_MPH,
        }
    }

    /// Build the provider and estimator from configuration
    pub fn from_config(config: &DirectionsConfig) -> Result<Self> {
        let provider = create_provider(config)?;
        info!("Directions provider initialized: {}", provider.name());

        Ok(Self::new(provider, config.api_key.clone())
            .with_policy(RetryPolicy::with_max_retries(config.max_retries))
            .with_attempt_timeout(Duration::from_secs(config.timeout_secs))
            .with_speed_mph(config.default_speed_mph))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_speed_mph(mut self, speed_mph: f64) -> Self {
        self.speed_mph = speed_mph;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether a provider key is present; without one every answer is a fallback
    pub fn is_configured(&self) -> bool {
        self.configured_key().is_some()
    }

    /// Estimate a route. Only `InvalidArgument` is ever returned as an error.
    pub async fn estimate(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        self.estimate_cancellable(request, &CancellationToken::new()).await
    }

    /// Like `estimate`, but abandons the in-flight attempt or backoff sleep
    /// as soon as `cancel` fires, returning `RoutingError::Cancelled`.
    pub async fn estimate_cancellable(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<RouteResult, RoutingError> {
        request.validate()?;

        let Some(api_key) = self.configured_key() else {
            let error = RoutingError::Configuration("no directions API key set".to_string());
            return self.degrade(request, &error);
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!("Directions attempt {} via {}", attempt, self.provider.name());

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(RoutingError::Cancelled),
                outcome = self.attempt(request, api_key) => outcome,
            };

            match self.policy.decide(attempt, outcome) {
                Decision::Done(route) => return Ok(normalize(request, route)),
                Decision::Retry { delay, error } => {
                    warn!(
                        "Directions attempt {} failed ({}), retrying in {:?}",
                        attempt, error, delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RoutingError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Decision::FallBack(error) => {
                    debug!("Giving up on provider after {} attempt(s)", attempt);
                    return self.degrade(request, &error);
                }
            }
        }
    }

    async fn attempt(&self, request: &RouteRequest, api_key: &str) -> Result<ProviderRoute, RoutingError> {
        let call = self
            .provider
            .fetch_route(&request.origin, &request.destination, api_key);

        match tokio::time::timeout(self.attempt_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RoutingError::TransientProvider(format!(
                "no response within {:?}",
                self.attempt_timeout
            ))),
        }
    }

    fn configured_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn degrade(&self, request: &RouteRequest, cause: &RoutingError) -> Result<RouteResult, RoutingError> {
        let route = fallback_route(request.origin, request.destination, self.speed_mph)?;
        warn!(
            "Serving straight-line fallback route {} -> {} ({:.1} mi): {}",
            request.origin, request.destination, route.distance_miles, cause
        );
        Ok(route)
    }
}

/// Convert provider units and pin the path to the requested endpoints
fn normalize(request: &RouteRequest, route: ProviderRoute) -> RouteResult {
    let mut path = route.coordinates;

    if path.first() != Some(&request.origin) {
        path.insert(0, request.origin);
    }
    if path.len() < 2 || path.last() != Some(&request.destination) {
        path.push(request.destination);
    }

    RouteResult {
        path,
        distance_miles: meters_to_miles(route.distance_meters),
        duration_minutes: seconds_to_minutes(route.duration_seconds),
        is_fallback: false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Provider double that replays a scripted sequence of outcomes
    pub(crate) struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ProviderRoute, RoutingError>>>,
        attempts: AtomicU32,
        hang: bool,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Vec<Result<ProviderRoute, RoutingError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                attempts: AtomicU32::new(0),
                hang: false,
            }
        }

        /// Provider that never answers
        pub(crate) fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::new(vec![])
            }
        }

        /// Always answers with the same route
        pub(crate) fn always(route: ProviderRoute) -> Self {
            Self::new(vec![Ok(route); 64])
        }

        pub(crate) fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DirectionsProvider for ScriptedProvider {
        async fn fetch_route(
            &self,
            _origin: &GeoPoint,
            _destination: &GeoPoint,
            _api_key: &str,
        ) -> Result<ProviderRoute, RoutingError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(RoutingError::PermanentProvider("script exhausted".into())))
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    fn new_york() -> GeoPoint {
        GeoPoint { lat: 40.7128, lng: -74.0060 }
    }

    fn los_angeles() -> GeoPoint {
        GeoPoint { lat: 34.0522, lng: -118.2437 }
    }

    fn request() -> RouteRequest {
        RouteRequest::new(new_york(), los_angeles())
    }

    pub(crate) fn provider_route() -> ProviderRoute {
        ProviderRoute {
            coordinates: vec![
                GeoPoint { lat: 40.7127, lng: -74.0059 },
                GeoPoint { lat: 39.0, lng: -95.0 },
                GeoPoint { lat: 34.0521, lng: -118.2436 },
            ],
            distance_meters: 4_500_000.0,
            duration_seconds: 144_000.0,
        }
    }

    fn estimator(provider: Arc<ScriptedProvider>) -> RouteEstimator {
        RouteEstimator::new(provider, Some("test-key".to_string()))
    }

    #[test]
    fn test_provider_kind_parses() {
        assert_eq!("openrouteservice".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouteService);
        assert_eq!("ORS".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouteService);
        assert_eq!(" Mapbox ".parse::<ProviderKind>().unwrap(), ProviderKind::Mapbox);
        assert!("google".parse::<ProviderKind>().is_err());
    }

    #[tokio::test]
    async fn test_no_api_key_falls_back_without_network() {
        let provider = Arc::new(ScriptedProvider::always(provider_route()));
        let estimator = RouteEstimator::new(provider.clone(), None);

        let result = assert_ok!(estimator.estimate(&request()).await);

        assert!(result.is_fallback);
        assert_eq!(result.path, vec![new_york(), los_angeles()]);
        assert_eq!(provider.attempts(), 0);
        assert!(!estimator.is_configured());
    }

    #[tokio::test]
    async fn test_blank_api_key_counts_as_missing() {
        let provider = Arc::new(ScriptedProvider::always(provider_route()));
        let estimator = RouteEstimator::new(provider.clone(), Some("   ".to_string()));

        let result = estimator.estimate(&request()).await.unwrap();
        assert!(result.is_fallback);
        assert_eq!(provider.attempts(), 0);
    }

    #[tokio::test]
    async fn test_new_york_to_los_angeles_fallback_distance() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let estimator = RouteEstimator::new(provider, None);

        let result = estimator.estimate(&request()).await.unwrap();

        assert!(result.is_fallback);
        assert_eq!(result.path.len(), 2);
        assert!(
            (result.distance_miles - 2451.0).abs() < 10.0,
            "Expected ~2451 mi, got {}",
            result.distance_miles
        );
        // 55 mph default
        assert!((result.duration_minutes - result.distance_miles / 55.0 * 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_identical_points_fallback() {
        let p = new_york();
        let estimator = RouteEstimator::new(Arc::new(ScriptedProvider::new(vec![])), None);

        let result = estimator.estimate(&RouteRequest::new(p, p)).await.unwrap();

        assert_eq!(result.distance_miles, 0.0);
        assert_eq!(result.duration_minutes, 0.0);
        assert_eq!(result.path, vec![p, p]);
    }

    #[tokio::test]
    async fn test_invalid_coordinates_surface_to_caller() {
        let provider = Arc::new(ScriptedProvider::always(provider_route()));
        let estimator = estimator(provider.clone());
        let bad = RouteRequest::new(GeoPoint { lat: f64::NAN, lng: 0.0 }, los_angeles());

        let err = assert_err!(estimator.estimate(&bad).await);

        assert!(matches!(err, RoutingError::InvalidArgument(_)));
        assert_eq!(provider.attempts(), 0);
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_even_without_key() {
        let estimator = RouteEstimator::new(Arc::new(ScriptedProvider::new(vec![])), None);
        let bad = RouteRequest::new(new_york(), GeoPoint { lat: 0.0, lng: 181.0 });

        assert!(matches!(
            estimator.estimate(&bad).await,
            Err(RoutingError::InvalidArgument(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_three_server_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(RoutingError::TransientProvider("HTTP 500".into())),
            Err(RoutingError::TransientProvider("HTTP 500".into())),
            Err(RoutingError::TransientProvider("HTTP 500".into())),
            Ok(provider_route()),
        ]));
        let estimator = estimator(provider.clone());

        let result = estimator.estimate(&request()).await.unwrap();

        assert!(!result.is_fallback);
        assert_eq!(provider.attempts(), 4);
        assert_eq!(result.path.first(), Some(&new_york()));
        assert_eq!(result.path.last(), Some(&los_angeles()));
        // 3 provider vertices plus both pinned endpoints
        assert_eq!(result.path.len(), 5);
        assert!((result.distance_miles - 4_500_000.0 / 1609.344).abs() < 1e-6);
        assert!((result.duration_minutes - 2400.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhausts_retries_then_falls_back() {
        let script = (0..10)
            .map(|_| Err(RoutingError::TransientProvider("HTTP 429".into())))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let estimator = estimator(provider.clone());

        let started = tokio::time::Instant::now();
        let result = estimator.estimate(&request()).await.unwrap();
        let waited = started.elapsed();

        assert!(result.is_fallback);
        assert_eq!(result.path, vec![new_york(), los_angeles()]);
        assert_eq!(provider.attempts(), 7);
        // 1.5 + 3 + 6 + 12 + 15 + 15 seconds of backoff
        assert!(waited >= Duration::from_millis(52_500), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(53), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_retry_budget_is_respected() {
        let script = (0..10)
            .map(|_| Err(RoutingError::TransientProvider("HTTP 503".into())))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let estimator = estimator(provider.clone()).with_policy(RetryPolicy::with_max_retries(2));

        let result = estimator.estimate(&request()).await.unwrap();

        assert!(result.is_fallback);
        assert_eq!(provider.attempts(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(RoutingError::PermanentProvider("HTTP 404".into())),
            Ok(provider_route()),
        ]));
        let estimator = estimator(provider.clone());

        let result = estimator.estimate(&request()).await.unwrap();

        assert!(result.is_fallback);
        assert_eq!(provider.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out_and_falls_back() {
        let provider = Arc::new(ScriptedProvider::hanging());
        let estimator = estimator(provider.clone())
            .with_attempt_timeout(Duration::from_secs(60))
            .with_policy(RetryPolicy::with_max_retries(1));

        let result = estimator.estimate(&request()).await.unwrap();

        assert!(result.is_fallback);
        assert_eq!(provider.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let script = (0..10)
            .map(|_| Err(RoutingError::TransientProvider("HTTP 503".into())))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let estimator = estimator(provider.clone());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        let err = estimator.estimate_cancellable(&request(), &cancel).await.unwrap_err();

        assert_eq!(err, RoutingError::Cancelled);
        // first attempt at t=0, second at t=1.5s, cancelled while waiting 3s
        assert_eq!(provider.attempts(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_aborts() {
        let provider = Arc::new(ScriptedProvider::hanging());
        let estimator = estimator(provider);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = estimator.estimate_cancellable(&request(), &cancel).await.unwrap_err();
        assert_eq!(err, RoutingError::Cancelled);
    }

    #[test]
    fn test_normalize_keeps_exact_endpoints() {
        let route = ProviderRoute {
            coordinates: vec![new_york(), los_angeles()],
            distance_meters: 1609.344,
            duration_seconds: 60.0,
        };

        let result = normalize(&request(), route);

        assert_eq!(result.path, vec![new_york(), los_angeles()]);
        assert!((result.distance_miles - 1.0).abs() < 1e-12);
        assert_eq!(result.duration_minutes, 1.0);
    }

    #[test]
    fn test_normalize_single_vertex_gets_both_endpoints() {
        let p = new_york();
        let route = ProviderRoute {
            coordinates: vec![p],
            distance_meters: 0.0,
            duration_seconds: 0.0,
        };

        let result = normalize(&RouteRequest::new(p, p), route);
        assert_eq!(result.path, vec![p, p]);
    }
}
