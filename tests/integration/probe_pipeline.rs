//! End-to-end pipeline tests: scheduler -> prober -> registry -> alerts

use std::sync::Arc;
use std::time::Duration;

use netpulse::AlertKind;
use netpulse::actors::{alert::AlertHandle, scheduler::SchedulerHandle};
use netpulse::registry::DeviceRegistry;

use crate::helpers::{ScriptedProber, down, test_monitor_config, up};

#[tokio::test]
async fn outage_and_recovery_produce_exactly_two_alerts() {
    let registry = Arc::new(DeviceRegistry::default());
    let device = registry.create("10.0.0.1", "edge-router").await.unwrap();

    let prober = ScriptedProber::new().script(
        "10.0.0.1",
        [up(50.0), down(), down(), down(), up(45.0)],
    );

    let alerts = AlertHandle::spawn(registry.subscribe(), None, None);
    let scheduler = SchedulerHandle::spawn(registry.clone(), Arc::new(prober), &test_monitor_config());

    for _ in 0..5 {
        scheduler.probe_now().await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = registry.get(device.id).await.unwrap().stats;
    assert_eq!(stats.total_probes, 5);
    assert_eq!(stats.failed_probes, 3);
    assert_eq!(stats.availability_pct, 40.0);
    assert_eq!(stats.total_downs, 1);
    assert!(stats.is_up);

    // First success counts as a recovery, then one down for the whole
    // outage, then the final recovery.
    let recorded = alerts.recent(10).await;
    let kinds: Vec<AlertKind> = recorded.iter().rev().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![AlertKind::Recovery, AlertKind::Down, AlertKind::Recovery]
    );

    scheduler.shutdown().await.unwrap();
    alerts.shutdown().await;
}

#[tokio::test]
async fn one_devices_failure_does_not_stall_the_others() {
    let registry = Arc::new(DeviceRegistry::default());
    let healthy = registry.create("10.0.0.1", "healthy").await.unwrap();
    let flaky = registry.create("10.0.0.2", "flaky").await.unwrap();

    let prober = ScriptedProber::new().script("10.0.0.2", [down(), down()]);

    let scheduler = SchedulerHandle::spawn(registry.clone(), Arc::new(prober), &test_monitor_config());

    scheduler.probe_now().await.unwrap();
    scheduler.probe_now().await.unwrap();

    let healthy_stats = registry.get(healthy.id).await.unwrap().stats;
    assert_eq!(healthy_stats.total_probes, 2);
    assert!(healthy_stats.is_up);

    let flaky_stats = registry.get(flaky.id).await.unwrap().stats;
    assert_eq!(flaky_stats.total_probes, 2);
    assert_eq!(flaky_stats.failed_probes, 2);
    assert!(!flaky_stats.is_up);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn history_records_every_cycle_in_order() {
    let registry = Arc::new(DeviceRegistry::default());
    let device = registry.create("10.0.0.1", "x").await.unwrap();

    let prober = ScriptedProber::new().script("10.0.0.1", [up(10.0), down(), up(30.0)]);
    let scheduler = SchedulerHandle::spawn(registry.clone(), Arc::new(prober), &test_monitor_config());

    for _ in 0..3 {
        scheduler.probe_now().await.unwrap();
    }

    let history = registry.history(device.id, 10).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].latency_ms, Some(10.0));
    assert!(!history[1].success);
    assert_eq!(history[1].latency_ms, None);
    assert_eq!(history[2].latency_ms, Some(30.0));
    assert!(history[0].timestamp <= history[2].timestamp);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn devices_added_mid_run_are_probed_in_later_cycles() {
    let registry = Arc::new(DeviceRegistry::default());
    registry.create("10.0.0.1", "first").await.unwrap();

    let scheduler = SchedulerHandle::spawn(
        registry.clone(),
        Arc::new(ScriptedProber::new()),
        &test_monitor_config(),
    );

    scheduler.probe_now().await.unwrap();

    let late = registry.create("10.0.0.2", "late-joiner").await.unwrap();
    scheduler.probe_now().await.unwrap();

    let stats = registry.get(late.id).await.unwrap().stats;
    assert_eq!(stats.total_probes, 1);

    scheduler.shutdown().await.unwrap();
}
