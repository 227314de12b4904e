//! ScriptedOracle - queued observations and failures for tests

use super::{fetch_failure, WeatherOracle};
use skyledger_core::{LocationDescriptor, Result, WeatherObservation};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Pops one scripted result per call; falls back to `fallback` when empty.
/// A `None` entry (or fallback) is a fetch failure.
pub struct ScriptedOracle {
    queue: Mutex<VecDeque<Option<WeatherObservation>>>,
    fallback: Option<WeatherObservation>,
    calls: Mutex<Vec<LocationDescriptor>>,
}

impl ScriptedOracle {
    /// Always returns `observation`.
    pub fn constant(observation: WeatherObservation) -> Self {
        Self::new(Vec::new(), Some(observation))
    }

    /// Always fails.
    pub fn failing() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Results in order, then failures.
    pub fn sequence(results: Vec<Option<WeatherObservation>>) -> Self {
        Self::new(results, None)
    }

    fn new(results: Vec<Option<WeatherObservation>>, fallback: Option<WeatherObservation>) -> Self {
        Self {
            queue: Mutex::new(results.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every location asked about, in order.
    pub async fn calls(&self) -> Vec<LocationDescriptor> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait::async_trait]
impl WeatherOracle for ScriptedOracle {
    fn name(&self) -> &str { "scripted" }

    async fn get_weather(&self, location: &LocationDescriptor) -> Result<WeatherObservation> {
        self.calls.lock().await.push(location.clone());
        let next = self
            .queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.ok_or_else(|| fetch_failure(location))
    }
}
