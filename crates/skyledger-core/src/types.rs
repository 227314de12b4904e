//! Core types for Skyledger

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Previous digest recorded by the first block of every ledger.
pub const GENESIS_DIGEST: &str = "0000000000000000";

/// Session identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Where an observation was taken. Compared as exact strings; no trimming
/// or case folding is applied anywhere.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LocationDescriptor {
    pub country: String,
    pub state: String,
    pub district: String,
}

impl LocationDescriptor {
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            district: district.into(),
        }
    }
}

impl std::fmt::Display for LocationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.district, self.state, self.country)
    }
}

/// Weather condition reported by the oracle
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeatherCondition {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Windy,
    Foggy,
    Hazy,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 8] = [
        Self::Sunny,
        Self::Cloudy,
        Self::Rainy,
        Self::Stormy,
        Self::Snowy,
        Self::Windy,
        Self::Foggy,
        Self::Hazy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Stormy => "Stormy",
            Self::Snowy => "Snowy",
            Self::Windy => "Windy",
            Self::Foggy => "Foggy",
            Self::Hazy => "Hazy",
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weather reading as produced by the oracle.
///
/// Field names on the wire match the oracle's JSON. Only the first four
/// fields are mandatory; the rest default when an oracle leaves them out.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WeatherObservation {
    #[serde(rename = "temperatureCelsius")]
    pub temperature_celsius: f64,
    #[serde(rename = "humidityPercent")]
    pub humidity_percent: f64,
    pub condition: WeatherCondition,
    #[serde(rename = "windSpeedKPH")]
    pub wind_speed_kph: f64,
    #[serde(rename = "precipitationChancePercent", default)]
    pub precipitation_chance_percent: f64,
    #[serde(rename = "precipitationAmountMM", default)]
    pub precipitation_amount_mm: f64,
    #[serde(rename = "uvIndex", default)]
    pub uv_index: f64,
    #[serde(rename = "visibilityKM", default)]
    pub visibility_km: f64,
    #[serde(rename = "airPressureHPA", default)]
    pub air_pressure_hpa: f64,
    #[serde(rename = "windDirection", default)]
    pub wind_direction: String,
    #[serde(rename = "severeWeatherAlert", default)]
    pub severe_weather_alert: String,
}

/// A fully resolved observation waiting to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingObservation {
    pub location: LocationDescriptor,
    pub weather: WeatherObservation,
    pub captured_at: DateTime<Utc>,
}

impl PendingObservation {
    pub fn new(
        location: LocationDescriptor,
        weather: WeatherObservation,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            location,
            weather,
            captured_at,
        }
    }
}

/// An appended ledger entry. Never mutated after append.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub sequence_id: u64,
    pub location: LocationDescriptor,
    pub weather: WeatherObservation,
    #[serde(with = "iso_millis")]
    pub captured_at: DateTime<Utc>,
    pub digest: String,
    pub previous_digest: String,
}

impl Block {
    /// The pending payload this block was built from.
    pub fn content(&self) -> PendingObservation {
        PendingObservation::new(self.location.clone(), self.weather.clone(), self.captured_at)
    }
}

/// Render a timestamp as RFC 3339 UTC with millisecond precision and a `Z`
/// suffix, e.g. `2024-05-01T12:00:00.000Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::iso_timestamp(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Source of capture timestamps. Swapped for a fixed clock in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Who wrote a transcript message
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A message as shown to the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}
