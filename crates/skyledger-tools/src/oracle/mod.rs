//! Weather oracles - where observations come from
//!
//! An oracle answers "what is the weather at this location right now".
//! Both entry paths go through [`ObservationSource`], which adds the
//! capture timestamp and the request timeout around the oracle call.

pub mod gemini;
pub mod scripted;
pub mod simulated;

pub use gemini::GeminiWeatherOracle;
pub use scripted::ScriptedOracle;
pub use simulated::SimulatedOracle;

use skyledger_core::{
    system_clock, Clock, Error, LocationDescriptor, PendingObservation, Result, WeatherObservation,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// External source of weather observations.
#[async_trait::async_trait]
pub trait WeatherOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn get_weather(&self, location: &LocationDescriptor) -> Result<WeatherObservation>;
}

/// The failure every oracle reports to the user.
pub fn fetch_failure(location: &LocationDescriptor) -> Error {
    Error::oracle_failure(
        location,
        format!("Failed to fetch weather data for {}. Please try again.", location.country),
    )
}

/// Oracle plus clock plus timeout: turns a location into a pending observation.
#[derive(Clone)]
pub struct ObservationSource {
    oracle: Arc<dyn WeatherOracle>,
    clock: Clock,
    timeout: Duration,
}

impl ObservationSource {
    pub fn new(oracle: Arc<dyn WeatherOracle>, timeout: Duration) -> Self {
        Self { oracle, clock: system_clock(), timeout }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Fetch the weather for `location` and stamp it with the capture time.
    pub async fn observe(&self, location: &LocationDescriptor) -> Result<PendingObservation> {
        debug!("Asking {} oracle about {}", self.oracle.name(), location);
        let weather = tokio::time::timeout(self.timeout, self.oracle.get_weather(location))
            .await
            .map_err(|_| Error::Timeout {
                operation: "weather oracle",
                secs: self.timeout.as_secs(),
            })??;
        Ok(PendingObservation::new(location.clone(), weather, (self.clock)()))
    }
}

impl std::fmt::Debug for ObservationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationSource")
            .field("oracle", &self.oracle.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
