pub mod actors;
pub mod config;
pub mod notifier;
pub mod prober;
pub mod registry;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque device identifier, assigned by the registry at creation and
/// immutable afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monitored network device together with its running statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// IPv4 address in dotted-quad notation, unique across the registry.
    pub address: String,
    /// Display name, mutable.
    pub label: String,
    pub stats: DeviceStats,
    pub created_at: DateTime<Utc>,
}

/// Running statistics for a device, updated exclusively by folding probe
/// results (see [`stats::fold`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub is_up: bool,

    /// Latency of the most recent probe; `None` after a failed probe.
    pub last_latency_ms: Option<f64>,

    /// Min/avg/max over all successful probes; `None` until the first
    /// successful probe, so a genuine 0 ms reading is distinguishable
    /// from "no data yet".
    pub latency: Option<LatencySummary>,

    /// Percentage of successful probes, in [0, 100]. 100 before any probe.
    pub availability_pct: f64,

    /// Number of up -> down transitions observed.
    pub total_downs: u64,

    pub failed_probes: u64,
    pub total_probes: u64,

    /// When the up/down state last changed. `None` until the first probe.
    pub last_status_change: Option<DateTime<Utc>>,

    /// Accumulated seconds spent up/down. Attributed at fold time for the
    /// state held since `last_status_change`, so these advance with the
    /// probe cadence rather than in real time.
    pub uptime_secs: f64,
    pub downtime_secs: f64,
}

impl Default for DeviceStats {
    fn default() -> Self {
        Self {
            is_up: false,
            last_latency_ms: None,
            latency: None,
            availability_pct: 100.0,
            total_downs: 0,
            failed_probes: 0,
            total_probes: 0,
            last_status_change: None,
            uptime_secs: 0.0,
            downtime_secs: 0.0,
        }
    }
}

/// Latency aggregates over all successful probes of a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

/// Outcome of a single probe, as reported by a [`prober::Prober`].
///
/// A successful probe always carries a latency; a failed one never does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    Up { latency_ms: f64 },
    Down,
}

impl ProbeOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProbeOutcome::Up { .. })
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Up { latency_ms } => Some(*latency_ms),
            ProbeOutcome::Down => None,
        }
    }
}

/// One probe result as retained in a device's bounded history.
///
/// Immutable after creation. The history exists for presentation (charting)
/// only; the aggregate statistics never read it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub device_id: DeviceId,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Down,
    Recovery,
}

/// An alert raised for a device state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub device_id: DeviceId,
    pub kind: AlertKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
}
