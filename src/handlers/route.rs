//! Route estimation message handler

use std::sync::Arc;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::routing::RouteEstimator;
use crate::types::{ErrorResponse, Request, RouteRequest, SuccessResponse};

/// Handle route.estimate messages
///
/// Each request runs on its own task: a request that is backing off against
/// a rate-limited provider must not hold up the rest.
pub async fn handle_estimate(
    client: Client,
    mut subscriber: Subscriber,
    estimator: Arc<RouteEstimator>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.estimate message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let client = client.clone();
        let estimator = Arc::clone(&estimator);
        tokio::spawn(async move {
            match process_estimate(&estimator, &msg.payload).await {
                Ok(body) => {
                    if let Err(e) = client.publish(reply, body.into()).await {
                        error!("Failed to publish route estimate: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize route estimate: {}", e),
            }
        });
    }

    Ok(())
}

/// Parse, estimate and serialize the reply for one request
pub async fn process_estimate(estimator: &RouteEstimator, payload: &[u8]) -> Result<Vec<u8>> {
    let request: Request<RouteRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
            return Ok(serde_json::to_vec(&error)?);
        }
    };

    match estimator.estimate(&request.payload).await {
        Ok(route) => {
            debug!(
                "Route estimate {:.1} mi / {:.0} min (fallback: {})",
                route.distance_miles, route.duration_minutes, route.is_fallback
            );
            Ok(serde_json::to_vec(&SuccessResponse::new(request.id, route))?)
        }
        Err(e) => {
            warn!("Rejected route request {}: {}", request.id, e);
            Ok(serde_json::to_vec(&ErrorResponse::new(request.id, e.code(), e.to_string()))?)
        }
    }
}
