//! getWeatherForLocation - fetch an observation and append it to the ledger

use crate::invocation::{ToolInvocation, GET_WEATHER_FOR_LOCATION};
use crate::oracle::ObservationSource;
use crate::registry::{Tool, ToolOutput};
use serde_json::{json, Value};
use skyledger_chain::IngestionCoordinator;
use skyledger_core::{Block, Result};
use tracing::info;

pub struct WeatherTool {
    source: ObservationSource,
    coordinator: IngestionCoordinator,
}

impl WeatherTool {
    pub fn new(source: ObservationSource, coordinator: IngestionCoordinator) -> Self {
        Self { source, coordinator }
    }
}

/// The sentence fed back to the service after a successful append.
pub fn weather_summary(block: &Block) -> String {
    format!(
        "Here's the weather for {}: It's {} with a temperature of {}°C and {}% humidity.",
        block.location.district,
        block.weather.condition,
        block.weather.temperature_celsius,
        block.weather.humidity_percent,
    )
}

#[async_trait::async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        GET_WEATHER_FOR_LOCATION
    }

    fn description(&self) -> &str {
        "Gets the current weather for a given location, specified by country, \
         state/province, and district/city."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "country": {
                    "type": "string",
                    "description": "The country of the location."
                },
                "state": {
                    "type": "string",
                    "description": "The state, province, or region of the location."
                },
                "district": {
                    "type": "string",
                    "description": "The district, city, or specific area."
                }
            },
            "required": ["country", "state", "district"]
        })
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let ToolInvocation::GetWeatherForLocation(location) = invocation;
        let pending = self.source.observe(&location).await?;
        let block = self.coordinator.submit(pending).await?;
        info!(sequence_id = block.sequence_id, "Chat appended weather for {}", block.location);

        Ok(ToolOutput {
            summary: weather_summary(&block),
            block: Some(block),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skyledger_core::{LocationDescriptor, WeatherCondition, WeatherObservation, GENESIS_DIGEST};

    #[test]
    fn summary_formats_whole_numbers_plainly() {
        let block = Block {
            sequence_id: 1,
            location: LocationDescriptor::new("France", "Ile-de-France", "Paris"),
            weather: WeatherObservation {
                temperature_celsius: 21.0,
                humidity_percent: 55.5,
                condition: WeatherCondition::Sunny,
                ..Default::default()
            },
            captured_at: Utc::now(),
            digest: "abcdabcdabcdabcd".into(),
            previous_digest: GENESIS_DIGEST.into(),
        };
        assert_eq!(
            weather_summary(&block),
            "Here's the weather for Paris: It's Sunny with a temperature of 21°C and 55.5% humidity."
        );
    }
}
