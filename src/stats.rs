//! Probe-result aggregation
//!
//! [`fold`] incorporates a single probe outcome into a device's running
//! statistics. It is a pure function: no I/O, no shared state, fully
//! exercisable with table-driven tests. All mutation of device statistics in
//! the rest of the crate goes through it.

use chrono::{DateTime, Utc};

use crate::{DeviceStats, LatencySummary, ProbeOutcome};

/// A change of the up/down state between two consecutive folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down,
    Recovery,
}

/// Fold one probe outcome into `prev`, returning the next statistics block
/// and the transition, if the up/down state changed.
///
/// Counting rules:
/// - every probe increments `total_probes`; failures also `failed_probes`
/// - availability is recomputed from the two counters
/// - latency min/avg/max only advance on success; the mean is updated
///   incrementally (`avg += (x - avg) / n` over successful probes)
/// - time since `last_status_change` is credited to the state held *before*
///   this fold, so uptime/downtime advance at probe cadence
/// - `total_downs` increments only on an up -> down transition
///
/// A brand-new device starts with `is_up = false`, so its first successful
/// probe is reported as a [`Transition::Recovery`]. The first fold also skips
/// uptime/downtime accounting since there is no `last_status_change` yet.
pub fn fold(
    prev: &DeviceStats,
    outcome: ProbeOutcome,
    now: DateTime<Utc>,
) -> (DeviceStats, Option<Transition>) {
    let mut next = prev.clone();

    next.total_probes = prev.total_probes + 1;
    if !outcome.success() {
        next.failed_probes = prev.failed_probes + 1;
    }
    next.availability_pct =
        100.0 * (next.total_probes - next.failed_probes) as f64 / next.total_probes as f64;

    match outcome {
        ProbeOutcome::Up { latency_ms } => {
            let successful = next.total_probes - next.failed_probes;
            next.latency = Some(match prev.latency {
                None => LatencySummary {
                    min_ms: latency_ms,
                    avg_ms: latency_ms,
                    max_ms: latency_ms,
                },
                Some(summary) => LatencySummary {
                    min_ms: summary.min_ms.min(latency_ms),
                    avg_ms: summary.avg_ms + (latency_ms - summary.avg_ms) / successful as f64,
                    max_ms: summary.max_ms.max(latency_ms),
                },
            });
            next.last_latency_ms = Some(latency_ms);
        }
        ProbeOutcome::Down => {
            next.last_latency_ms = None;
        }
    }

    // Credit the elapsed interval to the state we were in until now.
    if let Some(since) = prev.last_status_change {
        let elapsed = (now - since).num_milliseconds() as f64 / 1000.0;
        if prev.is_up {
            next.uptime_secs += elapsed;
        } else {
            next.downtime_secs += elapsed;
        }
    }

    let transition = match (prev.is_up, outcome.success()) {
        (true, false) => Some(Transition::Down),
        (false, true) => Some(Transition::Recovery),
        _ => None,
    };

    if matches!(transition, Some(Transition::Down)) {
        next.total_downs = prev.total_downs + 1;
    }

    next.is_up = outcome.success();
    if transition.is_some() {
        next.last_status_change = Some(now);
    }

    (next, transition)
}
