//! Tests for skyledger-chain: ledger invariants under the public submit path

use chrono::{Duration, TimeZone, Utc};
use skyledger_chain::*;
use skyledger_core::*;

fn observation(district: &str, temp: f64, minute: i64) -> PendingObservation {
    PendingObservation::new(
        LocationDescriptor::new("France", "Provence", district),
        WeatherObservation {
            temperature_celsius: temp,
            humidity_percent: 40.0,
            condition: WeatherCondition::Windy,
            wind_speed_kph: 35.0,
            precipitation_chance_percent: 5.0,
            precipitation_amount_mm: 0.0,
            uv_index: 6.0,
            visibility_km: 20.0,
            air_pressure_hpa: 1018.0,
            wind_direction: "N".into(),
            severe_weather_alert: "Mistral".into(),
        },
        Utc.with_ymd_and_hms(2024, 7, 14, 9, 0, 0).unwrap() + Duration::minutes(minute),
    )
}

// ===========================================================================
// Chain integrity and sequencing
// ===========================================================================

#[tokio::test]
async fn sequential_submits_form_a_valid_chain() {
    let ledger = SharedLedger::new();
    let coordinator = IngestionCoordinator::new(ledger.clone());

    for i in 0..10 {
        coordinator
            .submit(observation(&format!("District {}", i), 20.0 + i as f64, i))
            .await
            .unwrap();
    }

    let guard = ledger.read().await;
    let chain = guard.chain();
    assert_eq!(chain.len(), 10);
    assert_eq!(chain[0].previous_digest, GENESIS_DIGEST);
    for i in 1..chain.len() {
        assert_eq!(chain[i].previous_digest, chain[i - 1].digest);
    }
    for (i, block) in chain.iter().enumerate() {
        assert_eq!(block.sequence_id, i as u64 + 1);
    }
    assert!(guard.verify().is_ok());
}

#[tokio::test]
async fn snapshot_is_newest_first() {
    let ledger = SharedLedger::new();
    let coordinator = IngestionCoordinator::new(ledger.clone());
    coordinator.submit(observation("Arles", 25.0, 0)).await.unwrap();
    coordinator.submit(observation("Nice", 27.0, 1)).await.unwrap();

    let snapshot = ledger.snapshot().await;
    assert_eq!(snapshot[0].location.district, "Nice");
    assert_eq!(snapshot[1].location.district, "Arles");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_never_share_a_parent() {
    let ledger = SharedLedger::new();
    let coordinator = IngestionCoordinator::new(ledger.clone());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .submit(observation(&format!("Concurrent {}", i), i as f64, i))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let guard = ledger.read().await;
    assert_eq!(guard.len(), 32);
    assert!(guard.verify().is_ok());

    let mut parents: Vec<&str> = guard.chain().iter().map(|b| b.previous_digest.as_str()).collect();
    parents.sort_unstable();
    parents.dedup();
    assert_eq!(parents.len(), 32, "two blocks referenced the same previous digest");
}

// ===========================================================================
// Digest determinism
// ===========================================================================

#[tokio::test]
async fn identical_ledgers_produce_identical_digests() {
    let build = || async {
        let ledger = SharedLedger::new();
        let coordinator = IngestionCoordinator::new(ledger.clone());
        coordinator.submit(observation("Avignon", 22.0, 0)).await.unwrap();
        coordinator.submit(observation("Marseille", 24.0, 1)).await.unwrap();
        ledger.head().await
    };
    assert_eq!(build().await, build().await);
}

#[tokio::test]
async fn recompute_matches_stored_digests() {
    let ledger = SharedLedger::new();
    let coordinator = IngestionCoordinator::new(ledger.clone());
    for i in 0..4 {
        coordinator.submit(observation("Toulon", i as f64, i)).await.unwrap();
    }
    let guard = ledger.read().await;
    let stored: Vec<String> = guard.chain().iter().map(|b| b.digest.clone()).collect();
    assert_eq!(recompute_digests(guard.chain()).unwrap(), stored);
}

#[tokio::test]
async fn same_content_at_different_positions_differs() {
    let ledger = SharedLedger::new();
    let coordinator = IngestionCoordinator::new(ledger.clone());
    let a = coordinator.submit(observation("Gap", 10.0, 0)).await.unwrap();
    let b = coordinator.submit(observation("Gap", 10.0, 0)).await.unwrap();
    assert_ne!(a.digest, b.digest);
    assert_eq!(a.content(), b.content());
}
