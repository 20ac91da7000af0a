//! Device registry
//!
//! The registry is the authoritative in-memory owner of all device records.
//! Nothing else in the crate mutates device statistics; the scheduler and any
//! external submission path both go through [`DeviceRegistry::apply_probe_result`].
//!
//! ## Concurrency
//!
//! The device map sits behind an `RwLock`; each record additionally has its
//! own `Mutex`. Folds for one device serialize on the record lock (at most
//! one in-flight fold per device), while folds for different devices and
//! snapshot reads proceed independently. Readers always lock the record, so
//! they never observe a half-updated statistics block.
//!
//! ## Events
//!
//! State transitions and device removals are published on a broadcast
//! channel for the alert actor. Publishing is fire-and-forget: a registry
//! without subscribers still works, it just alerts nobody.

pub mod error;

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, trace};

use crate::stats::{self, Transition};
use crate::{Device, DeviceId, DeviceStats, ProbeOutcome, ProbeResult};

use error::{RegistryError, RegistryResult};

/// Probe results retained per device when no other limit is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Event published when a device changes up/down state
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub device_id: DeviceId,
    pub label: String,
    pub address: String,
    pub transition: Transition,
    pub at: DateTime<Utc>,
}

/// Events published by the registry on its broadcast channel
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Transition(TransitionEvent),

    /// A device was removed; consumers should drop dependent state
    /// (the alert actor purges that device's alerts).
    DeviceRemoved { device_id: DeviceId },
}

struct DeviceRecord {
    device: Device,
    history: VecDeque<ProbeResult>,
}

struct RegistryInner {
    devices: HashMap<DeviceId, Arc<Mutex<DeviceRecord>>>,
    by_address: HashMap<String, DeviceId>,
    next_id: u64,
}

/// In-memory authoritative map of device-id to device state
///
/// Constructed once at process start and injected into the scheduler and any
/// API layer, so tests get a fresh instance each.
pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
    history_limit: usize,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl DeviceRegistry {
    pub fn new(history_limit: usize) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            inner: RwLock::new(RegistryInner {
                devices: HashMap::new(),
                by_address: HashMap::new(),
                next_id: 0,
            }),
            history_limit,
            event_tx,
        }
    }

    /// Subscribe to transition and removal events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    fn validate_address(address: &str) -> RegistryResult<()> {
        Ipv4Addr::from_str(address)
            .map(|_| ())
            .map_err(|_| RegistryError::InvalidAddress(address.to_string()))
    }

    /// Register a new device
    ///
    /// The address must be a valid IPv4 dotted-quad and not already
    /// registered. Validation failures leave the registry untouched.
    pub async fn create(&self, address: &str, label: &str) -> RegistryResult<Device> {
        Self::validate_address(address)?;

        let mut inner = self.inner.write().await;

        if inner.by_address.contains_key(address) {
            return Err(RegistryError::DuplicateAddress(address.to_string()));
        }

        inner.next_id += 1;
        let id = DeviceId(inner.next_id);

        let device = Device {
            id,
            address: address.to_string(),
            label: label.to_string(),
            stats: DeviceStats::default(),
            created_at: Utc::now(),
        };

        inner.by_address.insert(address.to_string(), id);
        inner.devices.insert(
            id,
            Arc::new(Mutex::new(DeviceRecord {
                device: device.clone(),
                history: VecDeque::with_capacity(self.history_limit),
            })),
        );

        debug!("registered device {id} ({address}, \"{label}\")");

        Ok(device)
    }

    /// Update a device's address and label
    pub async fn update(&self, id: DeviceId, address: &str, label: &str) -> RegistryResult<Device> {
        Self::validate_address(address)?;

        let mut inner = self.inner.write().await;

        let record = inner
            .devices
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))?;

        if let Some(&other) = inner.by_address.get(address) {
            if other != id {
                return Err(RegistryError::DuplicateAddress(address.to_string()));
            }
        }

        let mut guard = record.lock().await;

        if guard.device.address != address {
            inner.by_address.remove(&guard.device.address);
            inner.by_address.insert(address.to_string(), id);
            guard.device.address = address.to_string();
        }
        guard.device.label = label.to_string();

        debug!("updated device {id} ({address}, \"{label}\")");

        Ok(guard.device.clone())
    }

    /// Remove a device, cascading its probe history and (via the removal
    /// event) its alerts
    pub async fn remove(&self, id: DeviceId) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;

        let record = inner.devices.remove(&id).ok_or(RegistryError::NotFound(id))?;
        let guard = record.lock().await;
        inner.by_address.remove(&guard.device.address);

        debug!("removed device {id} ({})", guard.device.address);

        let _ = self.event_tx.send(RegistryEvent::DeviceRemoved { device_id: id });

        Ok(())
    }

    /// Snapshot of a single device
    pub async fn get(&self, id: DeviceId) -> RegistryResult<Device> {
        let record = self
            .inner
            .read()
            .await
            .devices
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))?;

        let guard = record.lock().await;
        Ok(guard.device.clone())
    }

    /// Snapshot of all devices, sorted by label (case-insensitive)
    pub async fn list(&self) -> Vec<Device> {
        let records: Vec<_> = self.inner.read().await.devices.values().cloned().collect();

        let mut devices = Vec::with_capacity(records.len());
        for record in records {
            devices.push(record.lock().await.device.clone());
        }

        devices.sort_by(|a, b| {
            a.label
                .to_lowercase()
                .cmp(&b.label.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        devices
    }

    /// Fold one probe outcome into a device's statistics
    ///
    /// Runs under the device's record lock, appends to the bounded history,
    /// and publishes a [`TransitionEvent`] if the up/down state changed.
    /// Returns the transition so callers can react synchronously as well.
    pub async fn apply_probe_result(
        &self,
        id: DeviceId,
        outcome: ProbeOutcome,
        at: DateTime<Utc>,
    ) -> RegistryResult<Option<Transition>> {
        let record = self
            .inner
            .read()
            .await
            .devices
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))?;

        let mut guard = record.lock().await;

        let (next, transition) = stats::fold(&guard.device.stats, outcome, at);
        guard.device.stats = next;

        guard.history.push_back(ProbeResult {
            device_id: id,
            timestamp: at,
            success: outcome.success(),
            latency_ms: outcome.latency_ms(),
        });
        if guard.history.len() > self.history_limit {
            guard.history.pop_front();
        }

        trace!(
            "device {id}: probe folded (up: {}, availability: {:.1}%)",
            guard.device.stats.is_up, guard.device.stats.availability_pct
        );

        if let Some(transition) = transition {
            let event = TransitionEvent {
                device_id: id,
                label: guard.device.label.clone(),
                address: guard.device.address.clone(),
                transition,
                at,
            };

            // No subscribers is fine; the event is only advisory.
            let _ = self.event_tx.send(RegistryEvent::Transition(event));
        }

        Ok(transition)
    }

    /// Recent probe results for a device, oldest first
    pub async fn history(&self, id: DeviceId, limit: usize) -> RegistryResult<Vec<ProbeResult>> {
        let record = self
            .inner
            .read()
            .await
            .devices
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))?;

        let guard = record.lock().await;
        let skip = guard.history.len().saturating_sub(limit);
        Ok(guard.history.iter().skip(skip).cloned().collect())
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
