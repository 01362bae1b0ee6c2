use log::*;

use super::{Scout, Session};
use crate::map::{CurrentPosition, Severity};
use crate::services::location::{LocationService, PositionError};

impl Scout {
    /// Asks the device for a fresh fix and falls back to the configured
    /// coordinate when it cannot provide one.
    pub async fn locate(&self, session: &Session, device: &dyn LocationService) -> CurrentPosition {
        trace!("Attempting to get user location.");
        let fix = tokio::time::timeout(
            self.position_options.timeout,
            device.current_position(&self.position_options),
        )
        .await
        .unwrap_or(Err(PositionError::Timeout));

        let mut state = session.lock().await;
        match fix {
            Ok(position) => {
                info!(
                    "Current location: {} (accuracy {:?} m).",
                    position.coords, position.accuracy
                );
                state.located(position)
            }
            Err(PositionError::Unsupported) => {
                warn!("Geolocation not supported, using {}.", self.fallback);
                state.notify(
                    Severity::Warning,
                    "Geolocation is not supported by your device.",
                );
                state.fell_back(self.fallback, "Geolocation not supported")
            }
            Err(e) => {
                warn!("Error getting location: {e}. Using {}.", self.fallback);
                state.notify(
                    Severity::Warning,
                    "Could not retrieve your location. Please ensure location services are enabled and granted permission.",
                );
                state.fell_back(self.fallback, "failed to get your exact location")
            }
        }
    }
}
