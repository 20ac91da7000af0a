//! Registry CRUD scenarios exercised through the public API

use assert_matches::assert_matches;
use chrono::Utc;
use netpulse::registry::{DeviceRegistry, error::RegistryError};

use crate::helpers::up;

#[tokio::test]
async fn out_of_range_octet_is_an_invalid_address() {
    let registry = DeviceRegistry::default();

    let result = registry.create("300.1.1.1", "x").await;
    assert_matches!(result, Err(RegistryError::InvalidAddress(_)));
}

#[tokio::test]
async fn second_create_with_same_address_is_a_duplicate() {
    let registry = DeviceRegistry::default();

    registry.create("10.0.0.1", "first").await.unwrap();
    let result = registry.create("10.0.0.1", "second").await;
    assert_matches!(result, Err(RegistryError::DuplicateAddress(_)));
}

#[tokio::test]
async fn probing_a_removed_device_is_not_found() {
    let registry = DeviceRegistry::default();

    let device = registry.create("10.0.0.1", "x").await.unwrap();
    registry.remove(device.id).await.unwrap();

    let result = registry
        .apply_probe_result(device.id, up(10.0), Utc::now())
        .await;
    assert_matches!(result, Err(RegistryError::NotFound(_)));
}

#[tokio::test]
async fn update_changes_address_and_label() {
    let registry = DeviceRegistry::default();

    let device = registry.create("10.0.0.1", "old-name").await.unwrap();
    let updated = registry
        .update(device.id, "10.0.0.2", "new-name")
        .await
        .unwrap();

    assert_eq!(updated.address, "10.0.0.2");
    assert_eq!(updated.label, "new-name");

    // Statistics survive the rename.
    registry
        .apply_probe_result(device.id, up(10.0), Utc::now())
        .await
        .unwrap();
    let fetched = registry.get(device.id).await.unwrap();
    assert_eq!(fetched.stats.total_probes, 1);
}

#[tokio::test]
async fn external_submissions_share_the_aggregation_path() {
    // A manually submitted result goes through the same fold as the
    // scheduler's probes.
    let registry = DeviceRegistry::default();
    let device = registry.create("10.0.0.1", "x").await.unwrap();

    let transition = registry
        .apply_probe_result(device.id, up(42.0), Utc::now())
        .await
        .unwrap();

    assert!(transition.is_some());

    let fetched = registry.get(device.id).await.unwrap();
    assert_eq!(fetched.stats.last_latency_ms, Some(42.0));

    let history = registry.history(device.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].latency_ms, Some(42.0));
}
