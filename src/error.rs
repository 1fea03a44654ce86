//! Error taxonomy for route estimation

use thiserror::Error;

/// Errors produced while estimating a route.
///
/// Only `InvalidArgument` (and `Cancelled`, for internal callers that hold a
/// cancellation token) ever leave `RouteEstimator`; every other variant is
/// absorbed by the fallback policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// No provider credentials configured
    #[error("directions provider not configured: {0}")]
    Configuration(String),

    /// 408/429/5xx responses, timeouts and connection failures
    #[error("transient provider error: {0}")]
    TransientProvider(String),

    /// Any other non-2xx response, or a 2xx body with no usable route
    #[error("permanent provider error: {0}")]
    PermanentProvider(String),

    /// Malformed coordinates or estimator inputs
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller abandoned the request
    #[error("route request cancelled")]
    Cancelled,
}

impl RoutingError {
    /// Whether the retry policy may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoutingError::TransientProvider(_))
    }

    /// Stable error code used in NATS error responses
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::Configuration(_) => "CONFIGURATION_ERROR",
            RoutingError::TransientProvider(_) => "PROVIDER_UNAVAILABLE",
            RoutingError::PermanentProvider(_) => "PROVIDER_ERROR",
            RoutingError::InvalidArgument(_) => "INVALID_ARGUMENT",
            RoutingError::Cancelled => "CANCELLED",
        }
    }
}
