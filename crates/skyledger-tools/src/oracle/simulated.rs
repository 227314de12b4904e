//! Offline oracle: plausible, repeatable weather derived from the location

use super::{fetch_failure, WeatherOracle};
use skyledger_chain::digest;
use skyledger_core::{LocationDescriptor, Result, WeatherCondition, WeatherObservation};

const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Same location, same observation. Locations without a country fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedOracle;

impl SimulatedOracle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl WeatherOracle for SimulatedOracle {
    fn name(&self) -> &str { "simulated" }

    async fn get_weather(&self, location: &LocationDescriptor) -> Result<WeatherObservation> {
        if location.country.trim().is_empty() {
            return Err(fetch_failure(location));
        }
        Ok(simulate(location))
    }
}

fn simulate(location: &LocationDescriptor) -> WeatherObservation {
    let hex = digest(&format!(
        "{}\n{}\n{}",
        location.country, location.state, location.district
    ));
    let mut seed = u64::from_str_radix(&hex, 16).unwrap_or_default();
    // Pull successive small numbers out of the seed.
    let mut take = |range: u64| {
        let v = seed % range;
        seed /= range;
        v
    };

    let condition = WeatherCondition::ALL[take(8) as usize];
    let temperature = take(46) as f64 - 10.0;
    let humidity = 20.0 + take(76) as f64;
    let wind = take(60) as f64;
    let (chance, amount) = match condition {
        WeatherCondition::Rainy | WeatherCondition::Stormy | WeatherCondition::Snowy => {
            (60.0 + take(41) as f64, take(300) as f64 / 10.0)
        }
        _ => (take(30) as f64, 0.0),
    };

    WeatherObservation {
        temperature_celsius: temperature,
        humidity_percent: humidity,
        condition,
        wind_speed_kph: wind,
        precipitation_chance_percent: chance,
        precipitation_amount_mm: amount,
        uv_index: take(12) as f64,
        visibility_km: 1.0 + take(30) as f64,
        air_pressure_hpa: 980.0 + take(60) as f64,
        wind_direction: DIRECTIONS[take(8) as usize].to_string(),
        severe_weather_alert: if condition == WeatherCondition::Stormy {
            "Thunderstorm warning".to_string()
        } else {
            String::new()
        },
    }
}
