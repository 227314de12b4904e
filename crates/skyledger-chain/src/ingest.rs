//! Ingestion coordinator - the only way a block enters the ledger

use crate::digest::digest;
use crate::ledger::SharedLedger;
use serde::Serialize;
use skyledger_core::{
    iso_timestamp, Block, PendingObservation, Result, WeatherObservation, GENESIS_DIGEST,
};
use tracing::{debug, info};

/// Hashed view of an observation. Field order is part of the digest.
#[derive(Serialize)]
struct CanonicalContent<'a> {
    country: &'a str,
    state: &'a str,
    district: &'a str,
    weather: &'a WeatherObservation,
    timestamp: String,
}

/// Canonical JSON of an observation's semantic content.
pub fn canonical_content(pending: &PendingObservation) -> Result<String> {
    let content = CanonicalContent {
        country: &pending.location.country,
        state: &pending.location.state,
        district: &pending.location.district,
        weather: &pending.weather,
        timestamp: iso_timestamp(&pending.captured_at),
    };
    Ok(serde_json::to_string(&content)?)
}

/// Digest of `pending` chained onto `previous_digest`.
pub fn chain_digest(pending: &PendingObservation, previous_digest: &str) -> Result<String> {
    let mut material = canonical_content(pending)?;
    material.push_str(previous_digest);
    Ok(digest(&material))
}

/// Re-derive every digest of an oldest-first chain from the genesis
/// sentinel, ignoring the digests stored in the blocks.
pub fn recompute_digests(blocks: &[Block]) -> Result<Vec<String>> {
    let mut previous = GENESIS_DIGEST.to_string();
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        let next = chain_digest(&block.content(), &previous)?;
        out.push(next.clone());
        previous = next;
    }
    Ok(out)
}

/// Turns resolved observations into blocks. Holds no block state itself.
#[derive(Clone, Debug)]
pub struct IngestionCoordinator {
    ledger: SharedLedger,
}

impl IngestionCoordinator {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Hash `pending` against the current head and append it.
    ///
    /// The write lock is held from reading the head until the block is
    /// stored, so concurrent submitters never link to the same parent.
    pub async fn submit(&self, pending: PendingObservation) -> Result<Block> {
        let mut ledger = self.ledger.write().await;
        let previous = ledger.head().to_string();
        let digest = chain_digest(&pending, &previous)?;
        debug!("Hashed {} onto {} -> {}", pending.location, previous, digest);

        let block = ledger.append(pending, digest);
        drop(ledger);

        info!(
            sequence_id = block.sequence_id,
            digest = %block.digest,
            "Appended block for {}",
            block.location
        );
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skyledger_core::{LocationDescriptor, WeatherCondition};

    fn pending() -> PendingObservation {
        PendingObservation::new(
            LocationDescriptor::new("Japan", "Hokkaido", "Sapporo"),
            WeatherObservation {
                temperature_celsius: -3.0,
                humidity_percent: 70.0,
                condition: WeatherCondition::Snowy,
                wind_speed_kph: 20.0,
                precipitation_chance_percent: 90.0,
                precipitation_amount_mm: 5.5,
                uv_index: 1.0,
                visibility_km: 2.0,
                air_pressure_hpa: 1002.0,
                wind_direction: "NW".into(),
                severe_weather_alert: "Heavy snow".into(),
            },
            Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
        )
    }

    #[test]
    fn canonical_field_order() {
        let json = canonical_content(&pending()).unwrap();
        let country = json.find("\"country\"").unwrap();
        let state = json.find("\"state\"").unwrap();
        let district = json.find("\"district\"").unwrap();
        let weather = json.find("\"weather\"").unwrap();
        let timestamp = json.find("\"timestamp\"").unwrap();
        assert!(country < state && state < district && district < weather && weather < timestamp);
        assert!(json.ends_with(r#""timestamp":"2024-02-03T04:05:06.000Z"}"#));
    }

    #[test]
    fn chain_digest_is_deterministic() {
        let a = chain_digest(&pending(), GENESIS_DIGEST).unwrap();
        let b = chain_digest(&pending(), GENESIS_DIGEST).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), crate::DIGEST_LEN);
    }

    #[test]
    fn chain_digest_covers_previous() {
        let a = chain_digest(&pending(), GENESIS_DIGEST).unwrap();
        let b = chain_digest(&pending(), "1111111111111111").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn chain_digest_matches_manual_concatenation() {
        let p = pending();
        let expected = digest(&format!("{}{}", canonical_content(&p).unwrap(), GENESIS_DIGEST));
        assert_eq!(chain_digest(&p, GENESIS_DIGEST).unwrap(), expected);
    }

    #[tokio::test]
    async fn submit_appends_to_shared_ledger() {
        let ledger = SharedLedger::new();
        let coordinator = IngestionCoordinator::new(ledger.clone());

        let first = coordinator.submit(pending()).await.unwrap();
        assert_eq!(first.sequence_id, 1);
        assert_eq!(first.previous_digest, GENESIS_DIGEST);
        assert_eq!(ledger.head().await, first.digest);

        let second = coordinator.submit(pending()).await.unwrap();
        assert_eq!(second.previous_digest, first.digest);
        assert_ne!(second.digest, first.digest);
        assert_eq!(ledger.len().await, 2);
    }
}
