//! Gemini-backed weather oracle
//!
//! Asks `generateContent` for a JSON document constrained by a response
//! schema, then decodes it as a [`WeatherObservation`]. Any failure along the
//! way is logged and reported as the same user-facing fetch failure.

use super::{fetch_failure, WeatherOracle};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use skyledger_core::{LocationDescriptor, Result, WeatherCondition, WeatherObservation};
use tracing::{debug, error};

pub struct GeminiWeatherOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiWeatherOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: skyledger_core::config::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request(&self, location: &LocationDescriptor) -> std::result::Result<String, String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt(location) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("{}: {}", status, text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| e.to_string())?;
        if let Some(err) = parsed.error {
            return Err(err.message);
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err("empty response".into());
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl WeatherOracle for GeminiWeatherOracle {
    fn name(&self) -> &str { "gemini" }

    async fn get_weather(&self, location: &LocationDescriptor) -> Result<WeatherObservation> {
        let text = match self.request(location).await {
            Ok(text) => text,
            Err(reason) => {
                error!("Weather fetch for {} failed: {}", location, reason);
                return Err(fetch_failure(location));
            }
        };
        debug!("Oracle reply for {}: {}", location, text);

        decode_observation(&text).map_err(|e| {
            error!("Weather reply for {} did not decode: {}", location, e);
            fetch_failure(location)
        })
    }
}

fn prompt(location: &LocationDescriptor) -> String {
    format!(
        "Generate a realistic current weather report for {}. \
         Provide the data strictly in the requested JSON format.",
        location
    )
}

/// Models sometimes wrap JSON in markdown fences even when asked not to.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn decode_observation(text: &str) -> serde_json::Result<WeatherObservation> {
    serde_json::from_str(strip_code_fences(text))
}

fn response_schema() -> Value {
    let conditions: Vec<&str> = WeatherCondition::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "temperatureCelsius": { "type": "NUMBER", "description": "The current temperature in Celsius." },
            "humidityPercent": { "type": "NUMBER", "description": "The current humidity in percentage." },
            "condition": {
                "type": "STRING",
                "enum": conditions,
                "description": "The current weather condition."
            },
            "windSpeedKPH": { "type": "NUMBER", "description": "The current wind speed in kilometers per hour." },
            "precipitationChancePercent": { "type": "NUMBER", "description": "Chance of precipitation in percent." },
            "precipitationAmountMM": { "type": "NUMBER", "description": "Expected precipitation in millimetres." },
            "uvIndex": { "type": "NUMBER", "description": "The current UV index." },
            "visibilityKM": { "type": "NUMBER", "description": "Visibility in kilometres." },
            "airPressureHPA": { "type": "NUMBER", "description": "Air pressure in hectopascals." },
            "windDirection": { "type": "STRING", "description": "Compass wind direction, e.g. NW." },
            "severeWeatherAlert": { "type": "STRING", "description": "Active severe weather alert, or empty." }
        },
        "required": ["temperatureCelsius", "humidityPercent", "condition", "windSpeedKPH"]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
