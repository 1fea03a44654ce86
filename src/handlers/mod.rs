//! NATS message handlers

pub mod navigation;
pub mod ping;
pub mod route;

use std::sync::Arc;
use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;
use crate::services::routing::RouteEstimator;
use navigation::NavigationContext;

/// Buffered status updates awaiting publication
const UPDATE_QUEUE_SIZE: usize = 256;

/// Start all message handlers
pub async fn start_handlers(client: Client, config: &Config) -> Result<()> {
    let estimator = Arc::new(RouteEstimator::from_config(&config.directions)?);
    if estimator.is_configured() {
        info!("Directions provider: {}", estimator.provider_name());
    } else {
        info!("No directions API key configured, serving straight-line estimates only");
    }

    let (updates_tx, updates_rx) = mpsc::channel(UPDATE_QUEUE_SIZE);
    let navigation = Arc::new(NavigationContext::new(
        Arc::clone(&estimator),
        config.route_refresh_interval,
        updates_tx,
    ));

    // Subscribe to subjects
    let ping_sub = client.subscribe("loadrush.ping").await?;
    let estimate_sub = client.subscribe("loadrush.route.estimate").await?;
    let nav_start_sub = client.subscribe("loadrush.navigation.start").await?;
    let nav_location_sub = client.subscribe("loadrush.navigation.location").await?;
    let nav_stop_sub = client.subscribe("loadrush.navigation.stop").await?;

    info!("Subscribed to NATS subjects");

    let client_ping = client.clone();
    let client_estimate = client.clone();
    let client_nav_start = client.clone();
    let client_nav_location = client.clone();
    let client_nav_stop = client.clone();
    let client_publisher = client.clone();

    let nav_start_ctx = Arc::clone(&navigation);
    let nav_location_ctx = Arc::clone(&navigation);
    let nav_stop_ctx = Arc::clone(&navigation);
    let provider_configured = estimator.is_configured();

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, provider_configured).await
    });

    let estimate_handle = tokio::spawn(async move {
        route::handle_estimate(client_estimate, estimate_sub, estimator).await
    });

    let nav_start_handle = tokio::spawn(async move {
        navigation::handle_start(client_nav_start, nav_start_sub, nav_start_ctx).await
    });

    let nav_location_handle = tokio::spawn(async move {
        navigation::handle_location(client_nav_location, nav_location_sub, nav_location_ctx).await
    });

    let nav_stop_handle = tokio::spawn(async move {
        navigation::handle_stop(client_nav_stop, nav_stop_sub, nav_stop_ctx).await
    });

    let publisher_handle = tokio::spawn(async move {
        navigation::publish_updates(client_publisher, updates_rx).await
    });

    info!("All handlers started, waiting for messages...");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = estimate_handle => {
            error!("Route estimate handler finished: {:?}", result);
        }
        result = nav_start_handle => {
            error!("Navigation start handler finished: {:?}", result);
        }
        result = nav_location_handle => {
            error!("Navigation location handler finished: {:?}", result);
        }
        result = nav_stop_handle => {
            error!("Navigation stop handler finished: {:?}", result);
        }
        result = publisher_handle => {
            error!("Navigation update publisher finished: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    let active = navigation.registry().len();
    if active > 0 {
        info!("Stopping {} active navigation session(s)", active);
    }
    navigation.registry().stop_all();

    Ok(())
}
