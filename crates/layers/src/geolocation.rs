use std::time::Duration;

use foundation::LatLng;
use futures_util::future::LocalBoxFuture;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the device may return.
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
}

impl GeolocationError {
    pub fn user_message(self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Enable location permissions to center the map on you."
            }
            GeolocationError::PositionUnavailable => {
                "Your location could not be determined. Showing the default area."
            }
            GeolocationError::Timeout => {
                "Finding your location took too long. Showing the default area."
            }
        }
    }
}

/// One-shot device position lookup.
pub trait Geolocator {
    fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> LocalBoxFuture<'_, Result<LatLng, GeolocationError>>;
}

/// Runs `geolocator` under `options.timeout` and rejects unusable fixes.
pub async fn locate(
    geolocator: &dyn Geolocator,
    options: &GeolocationOptions,
) -> Result<LatLng, GeolocationError> {
    let position = tokio::time::timeout(options.timeout, geolocator.current_position(options))
        .await
        .map_err(|_| GeolocationError::Timeout)??;
    if !position.is_valid() {
        warn!(lat = position.lat, lng = position.lng, "geolocator returned an invalid fix");
        return Err(GeolocationError::PositionUnavailable);
    }
    debug!(lat = position.lat, lng = position.lng, "located device");
    Ok(position)
}

/// Answers every request with the same outcome, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    outcome: Result<LatLng, GeolocationError>,
    delay: Option<Duration>,
}

impl FixedGeolocator {
    pub fn at(position: LatLng) -> Self {
        Self {
            outcome: Ok(position),
            delay: None,
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Geolocator for FixedGeolocator {
    fn current_position(
        &self,
        _options: &GeolocationOptions,
    ) -> LocalBoxFuture<'_, Result<LatLng, GeolocationError>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fix() {
        let g = FixedGeolocator::at(LatLng::new(10.7, 122.56));
        let options = GeolocationOptions::default();
        assert_eq!(locate(&g, &options).await, Ok(LatLng::new(10.7, 122.56)));
    }

    #[tokio::test]
    async fn causes_stay_distinct() {
        let options = GeolocationOptions::default();
        for err in [
            GeolocationError::PermissionDenied,
            GeolocationError::PositionUnavailable,
            GeolocationError::Timeout,
        ] {
            let g = FixedGeolocator::failing(err);
            assert_eq!(locate(&g, &options).await, Err(err));
        }
        assert_ne!(
            GeolocationError::PermissionDenied.user_message(),
            GeolocationError::Timeout.user_message()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_geolocator_times_out() {
        let g = FixedGeolocator::at(LatLng::new(10.7, 122.56)).with_delay(Duration::from_secs(30));
        let options = GeolocationOptions::default();
        assert_eq!(locate(&g, &options).await, Err(GeolocationError::Timeout));
    }

    #[tokio::test]
    async fn invalid_fix_is_unavailable() {
        let g = FixedGeolocator::at(LatLng::new(f64::NAN, 0.0));
        let options = GeolocationOptions::default();
        assert_eq!(
            locate(&g, &options).await,
            Err(GeolocationError::PositionUnavailable)
        );
    }
}
