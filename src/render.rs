//! Plain-text rendering of blocks and chat messages

use skyledger_chain::ChainViolation;
use skyledger_core::{iso_timestamp, Block, ChatMessage, Sender};

/// One block as a small text card.
pub fn format_block(block: &Block) -> String {
    let w = &block.weather;
    let mut out = String::new();
    out.push_str(&format!(
        "─── #{} {} ───\n",
        block.sequence_id, block.location
    ));
    out.push_str(&format!("  captured  {}\n", iso_timestamp(&block.captured_at)));
    out.push_str(&format!(
        "  {} {}°C, {}% humidity, wind {} km/h {}\n",
        w.condition, w.temperature_celsius, w.humidity_percent, w.wind_speed_kph, w.wind_direction
    ));
    out.push_str(&format!(
        "  precip {}% / {} mm, UV {}, visibility {} km, {} hPa\n",
        w.precipitation_chance_percent,
        w.precipitation_amount_mm,
        w.uv_index,
        w.visibility_km,
        w.air_pressure_hpa
    ));
    if !w.severe_weather_alert.is_empty() {
        out.push_str(&format!("  ALERT: {}\n", w.severe_weather_alert));
    }
    out.push_str(&format!(
        "  digest {} <- {}\n",
        block.digest, block.previous_digest
    ));
    out
}

/// Blocks in the order given, separated by blank lines.
pub fn format_ledger(blocks: &[Block]) -> String {
    if blocks.is_empty() {
        return "Ledger is empty.\n".to_string();
    }
    blocks
        .iter()
        .map(format_block)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_verification(len: usize, result: &Result<(), ChainViolation>) -> String {
    match result {
        Ok(()) => format!("Chain OK ({} blocks)\n", len),
        Err(v) => format!("Chain BROKEN: {}\n", v),
    }
}

pub fn format_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    format!("[{}] {}\n", who, message.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skyledger_core::{LocationDescriptor, WeatherCondition, WeatherObservation, GENESIS_DIGEST};

    fn block() -> Block {
        Block {
            sequence_id: 3,
            location: LocationDescriptor::new("Iceland", "Capital Region", "Reykjavik"),
            weather: WeatherObservation {
                temperature_celsius: -2.5,
                humidity_percent: 88.0,
                condition: WeatherCondition::Snowy,
                severe_weather_alert: "Blizzard".into(),
                ..Default::default()
            },
            captured_at: Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap(),
            digest: "0123456789abcdef".into(),
            previous_digest: GENESIS_DIGEST.into(),
        }
    }

    #[test]
    fn block_card_has_essentials() {
        let card = format_block(&block());
        assert!(card.starts_with("─── #3 Reykjavik, Capital Region, Iceland ───"));
        assert!(card.contains("Snowy -2.5°C, 88% humidity"));
        assert!(card.contains("2024-01-05T07:00:00.000Z"));
        assert!(card.contains("ALERT: Blizzard"));
        assert!(card.contains("0123456789abcdef <- 0000000000000000"));
    }

    #[test]
    fn empty_ledger() {
        assert_eq!(format_ledger(&[]), "Ledger is empty.\n");
    }

    #[test]
    fn verification_lines() {
        assert_eq!(format_verification(2, &Ok(())), "Chain OK (2 blocks)\n");
        let broken = Err(ChainViolation::SequenceGap { position: 0, expected: 1, found: 2 });
        assert!(format_verification(1, &broken).starts_with("Chain BROKEN"));
        let unhashable = Err(ChainViolation::Unhashable { sequence_id: 4, reason: "bad float".into() });
        assert_eq!(
            format_verification(4, &unhashable),
            "Chain BROKEN: block 4 content could not be serialized: bad float\n"
        );
    }

    #[test]
    fn message_prefix() {
        assert_eq!(format_message(&ChatMessage::user("hi")), "[you] hi\n");
    }
}
