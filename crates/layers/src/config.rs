use std::time::Duration;

use feeds::{FeedConfig, HazardScope};
use foundation::LatLng;

use crate::geolocation::GeolocationOptions;
use crate::provider::CredentialFormat;

/// Iloilo City.
pub const DEFAULT_CENTER: LatLng = LatLng::new(10.7302, 122.5591);

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub feed: FeedConfig,
    pub provider_credential: Option<String>,
    pub credential_format: CredentialFormat,
    /// Upper bound on one source fetch, health check included.
    pub fetch_timeout: Duration,
    pub pulse_period: Duration,
    pub pulse_modulus: u32,
    pub default_center: LatLng,
    pub scope_radius_km: f64,
    pub scope_hours: Option<u32>,
    pub geolocation: GeolocationOptions,
    pub show_center_indicator: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            provider_credential: None,
            credential_format: CredentialFormat::default(),
            fetch_timeout: Duration::from_secs(12),
            pulse_period: Duration::from_millis(500),
            pulse_modulus: 10,
            default_center: DEFAULT_CENTER,
            scope_radius_km: 25.0,
            scope_hours: None,
            geolocation: GeolocationOptions::default(),
            show_center_indicator: false,
        }
    }
}

impl OverlayConfig {
    /// Defaults overridden by `HAZARD_*` / `MAP_PROVIDER_KEY` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base) = env_string("HAZARD_FEED_BASE_URL") {
            config.feed.base_url = base;
        }
        config.provider_credential = env_string("MAP_PROVIDER_KEY");
        config.fetch_timeout = env_millis("HAZARD_FETCH_TIMEOUT_MS", config.fetch_timeout);
        config.feed.request_timeout = config.fetch_timeout;
        config.pulse_period = env_millis("HAZARD_PULSE_PERIOD_MS", config.pulse_period);
        config.scope_radius_km = env_f64("HAZARD_SCOPE_RADIUS_KM", config.scope_radius_km);
        config.scope_hours = env_string("HAZARD_SCOPE_HOURS").and_then(|s| s.parse().ok());
        config
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.provider_credential = Some(credential.into());
        self
    }

    pub fn scope_at(&self, center: LatLng) -> HazardScope {
        HazardScope::new(center, self.scope_radius_km).with_hours(self.scope_hours)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env_string(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_string(key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}
