//! End-to-end: both entry paths wired through App against scripted doubles

use chrono::{TimeZone, Utc};
use serde_json::json;
use skyledger::{App, Outcome};
use skyledger_chain::recompute_digests;
use skyledger_core::*;
use skyledger_llm::{ScriptedProvider, ScriptedReply};
use skyledger_tools::{FormInput, ScriptedOracle};
use std::sync::Arc;

fn observation(condition: WeatherCondition, t: f64) -> WeatherObservation {
    WeatherObservation {
        temperature_celsius: t,
        humidity_percent: 55.0,
        condition,
        wind_speed_kph: 14.0,
        precipitation_chance_percent: 10.0,
        precipitation_amount_mm: 0.0,
        uv_index: 5.0,
        visibility_km: 10.0,
        air_pressure_hpa: 1013.0,
        wind_direction: "W".into(),
        severe_weather_alert: String::new(),
    }
}

fn fixed_clock() -> Clock {
    let at = Utc.with_ymd_and_hms(2024, 9, 21, 15, 45, 30).unwrap();
    Arc::new(move || at)
}

fn app(replies: Vec<ScriptedReply>, oracle: ScriptedOracle) -> App {
    App::with_parts(
        SkyledgerConfig::default(),
        Arc::new(oracle),
        Some(Arc::new(ScriptedProvider::sequence(replies))),
        fixed_clock(),
    )
}

#[tokio::test]
async fn france_then_japan_through_chat() {
    let app = app(
        vec![
            ScriptedReply::tool_call(
                "getWeatherForLocation",
                json!({"country": "France", "state": "Ile-de-France", "district": "Paris"}),
            ),
            ScriptedReply::text("Paris is sunny at 24°C."),
            ScriptedReply::tool_call(
                "getWeatherForLocation",
                json!({"country": "Japan", "state": "Tokyo", "district": "Shinjuku"}),
            ),
            ScriptedReply::text("Shinjuku is rainy at 19°C."),
        ],
        ScriptedOracle::sequence(vec![
            Some(observation(WeatherCondition::Sunny, 24.0)),
            Some(observation(WeatherCondition::Rainy, 19.0)),
        ]),
    );

    assert_eq!(app.chat("What's the weather in Paris, France?").await.unwrap(), "Paris is sunny at 24°C.");
    assert_eq!(app.chat("And Shinjuku in Tokyo?").await.unwrap(), "Shinjuku is rainy at 19°C.");

    let guard = app.ledger().read().await;
    let chain = guard.chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].location.country, "France");
    assert_eq!(chain[1].location.country, "Japan");
    assert_eq!(chain[1].sequence_id, 2);
    assert_eq!(chain[0].previous_digest, GENESIS_DIGEST);
    assert_eq!(chain[1].previous_digest, chain[0].digest);
    assert!(guard.verify().is_ok());
}

#[tokio::test]
async fn form_and_chat_paths_are_equivalent() {
    let weather = observation(WeatherCondition::Cloudy, 16.0);
    let app = app(
        vec![
            ScriptedReply::tool_call(
                "getWeatherForLocation",
                json!({"country": "Canada", "state": "Quebec", "district": "Montreal"}),
            ),
            ScriptedReply::text("Cloudy in Montreal."),
        ],
        ScriptedOracle::constant(weather),
    );

    let manual = app
        .add(&FormInput::new("Canada", "Quebec", "Montreal"))
        .await
        .unwrap();
    app.chat("Montreal weather?").await.unwrap();

    let snapshot = app.ledger().snapshot().await;
    let chat = &snapshot[0];
    assert_eq!(chat.location, manual.location);
    assert_eq!(chat.weather, manual.weather);
    assert_eq!(chat.captured_at, manual.captured_at);
    assert_eq!(chat.previous_digest, manual.digest);
    assert_ne!(chat.digest, manual.digest);
    assert_ne!(chat.sequence_id, manual.sequence_id);
}

#[tokio::test]
async fn failed_chat_lookup_leaves_ledger_alone() {
    let app = app(
        vec![ScriptedReply::tool_call(
            "getWeatherForLocation",
            json!({"country": "Nowhere", "state": "", "district": ""}),
        )],
        ScriptedOracle::failing(),
    );

    assert_eq!(app.chat("Weather in Nowhere?").await.unwrap(), CHAT_FAILURE_MESSAGE);
    assert!(app.ledger().is_empty().await);

    let transcript = app.agent().unwrap().transcript().await;
    assert_eq!(transcript.last().unwrap(), &ChatMessage::bot(CHAT_FAILURE_MESSAGE));
}

#[tokio::test]
async fn repl_lines_drive_both_paths() {
    let app = app(
        vec![
            ScriptedReply::tool_call(
                "getWeatherForLocation",
                json!({"country": "Spain", "state": "Andalusia", "district": "Seville"}),
            ),
            ScriptedReply::text("Hot in Seville."),
        ],
        ScriptedOracle::constant(observation(WeatherCondition::Sunny, 38.0)),
    );

    let added = app.dispatch("/add Spain|Madrid|Madrid").await;
    assert!(matches!(&added, Outcome::Print(t) if t.contains("#1 Madrid, Madrid, Spain")));

    let chat = app.dispatch("How about Seville?").await;
    assert_eq!(chat, Outcome::Print("[bot] Hot in Seville.\n".into()));

    let listing = app.dispatch("/ledger").await;
    match listing {
        Outcome::Print(text) => {
            let seville = text.find("Seville").unwrap();
            let madrid = text.find("#1 Madrid").unwrap();
            assert!(seville < madrid, "ledger should list newest first");
        }
        Outcome::Quit => panic!("unexpected quit"),
    }

    let guard = app.ledger().read().await;
    let stored: Vec<String> = guard.chain().iter().map(|b| b.digest.clone()).collect();
    assert_eq!(recompute_digests(guard.chain()).unwrap(), stored);
}
