use std::time::Duration;

/// Canonical cruising speed for straight-line estimates
pub const DEFAULT_SPEED_MPH: f64 = 55.0;

pub const DEFAULT_DIRECTIONS_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 6;
pub const DEFAULT_ROUTE_REFRESH_SECS: u64 = 15;

pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
pub const DEFAULT_OPENROUTESERVICE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_MAPBOX_URL: &str = "https://api.mapbox.com";

pub fn default_retry_base_delay() -> Duration {
    Duration::from_millis(1500)
}

pub fn default_retry_max_delay() -> Duration {
    Duration::from_secs(15)
}
