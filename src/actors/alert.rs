//! AlertActor - Turns device state transitions into alert records
//!
//! The actor does not detect transitions itself; that is the fold's job. It
//! consumes [`RegistryEvent`]s and records exactly one [`Alert`] per
//! transition event it receives - N consecutive failed probes after an up
//! state produce one `down` alert, not N. Duplicate delivery of the same
//! underlying probe event must be de-duplicated upstream; the actor has no
//! dedup key beyond device, kind and timestamp.
//!
//! Besides recording, the actor serves the alert query surface (recent
//! alerts, acknowledge, cleanup, statistics) and optionally forwards each
//! new alert to a webhook.

use std::collections::VecDeque;

use chrono::{Duration, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;
use tracing::{debug, info, instrument, trace, warn};

use crate::notifier::WebhookNotifier;
use crate::registry::{RegistryEvent, TransitionEvent};
use crate::stats::Transition;
use crate::{Alert, AlertKind};

use super::messages::{AlertCommand, AlertStats};

/// Hard cap on retained alerts; oldest are evicted beyond this
const MAX_RETAINED_ALERTS: usize = 10_000;

/// Cadence of the automatic retention cleanup
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Actor that records and serves alerts
pub struct AlertActor {
    /// Retained alerts, oldest first
    alerts: VecDeque<Alert>,

    /// Next alert id (process-local, monotonically increasing)
    next_id: u64,

    /// Command receiver
    command_rx: mpsc::Receiver<AlertCommand>,

    /// Registry event receiver (broadcast subscription)
    event_rx: broadcast::Receiver<RegistryEvent>,

    /// Optional webhook target for new alerts
    notifier: Option<WebhookNotifier>,

    /// Alerts older than this many days are removed automatically
    retention_days: Option<u32>,
}

impl AlertActor {
    pub fn new(
        command_rx: mpsc::Receiver<AlertCommand>,
        event_rx: broadcast::Receiver<RegistryEvent>,
        notifier: Option<WebhookNotifier>,
        retention_days: Option<u32>,
    ) -> Self {
        if let Some(days) = retention_days {
            debug!("automatic alert cleanup enabled: {days} days");
        }

        Self {
            alerts: VecDeque::new(),
            next_id: 0,
            command_rx,
            event_rx,
            notifier,
            retention_days,
        }
    }

    /// Run the actor's main loop
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting alert actor");

        let has_retention = self.retention_days.is_some();
        let mut cleanup_ticker = time::interval(CLEANUP_INTERVAL);

        loop {
            tokio::select! {
                // Retention trigger (daily; the immediate first tick is a
                // harmless no-op cleanup on startup)
                _ = cleanup_ticker.tick(), if has_retention => {
                    if let Some(days) = self.retention_days {
                        let removed = self.cleanup(days);
                        if removed > 0 {
                            info!("retention cleanup removed {removed} alerts older than {days} days");
                        }
                    }
                }

                // Receive registry events
                result = self.event_rx.recv() => {
                    match result {
                        Ok(RegistryEvent::Transition(event)) => {
                            self.record_transition(event).await;
                        }
                        Ok(RegistryEvent::DeviceRemoved { device_id }) => {
                            let before = self.alerts.len();
                            self.alerts.retain(|alert| alert.device_id != device_id);
                            trace!(
                                "purged {} alerts for removed device {device_id}",
                                before - self.alerts.len()
                            );
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("alert actor lagged, skipped {skipped} registry events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("registry event channel closed, shutting down");
                            break;
                        }
                    }
                }

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    if self.handle_command(cmd) {
                        break;
                    }
                }

                // Command channel closed
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("alert actor stopped");
    }

    /// Record one alert for a transition event
    #[instrument(skip(self, event), fields(device_id = %event.device_id))]
    async fn record_transition(&mut self, event: TransitionEvent) {
        let kind = match event.transition {
            Transition::Down => AlertKind::Down,
            Transition::Recovery => AlertKind::Recovery,
        };

        let message = match kind {
            AlertKind::Down => format!("Device {} ({}) is down", event.label, event.address),
            AlertKind::Recovery => {
                format!("Device {} ({}) recovered", event.label, event.address)
            }
        };

        self.next_id += 1;
        let alert = Alert {
            id: self.next_id,
            device_id: event.device_id,
            kind,
            message,
            created_at: event.at,
            acknowledged: false,
        };

        debug!("alert #{}: {}", alert.id, alert.message);

        if let Some(notifier) = &self.notifier {
            notifier.notify(&alert).await;
        }

        self.alerts.push_back(alert);
        if self.alerts.len() > MAX_RETAINED_ALERTS {
            self.alerts.pop_front();
        }
    }

    /// Handle a command; returns true if the actor should stop
    fn handle_command(&mut self, cmd: AlertCommand) -> bool {
        match cmd {
            AlertCommand::Recent { limit, respond_to } => {
                let recent: Vec<Alert> =
                    self.alerts.iter().rev().take(limit).cloned().collect();
                let _ = respond_to.send(recent);
            }

            AlertCommand::Acknowledge {
                alert_id,
                respond_to,
            } => {
                let found = match self.alerts.iter_mut().find(|a| a.id == alert_id) {
                    Some(alert) => {
                        alert.acknowledged = true;
                        true
                    }
                    None => false,
                };
                let _ = respond_to.send(found);
            }

            AlertCommand::AcknowledgeAll { respond_to } => {
                let mut count = 0;
                for alert in self.alerts.iter_mut().filter(|a| !a.acknowledged) {
                    alert.acknowledged = true;
                    count += 1;
                }
                debug!("acknowledged {count} alerts");
                let _ = respond_to.send(count);
            }

            AlertCommand::Cleanup {
                older_than_days,
                respond_to,
            } => {
                let removed = self.cleanup(older_than_days);
                debug!("cleanup removed {removed} alerts older than {older_than_days} days");
                let _ = respond_to.send(removed);
            }

            AlertCommand::GetStats { respond_to } => {
                let stats = AlertStats {
                    total: self.alerts.len(),
                    down: self
                        .alerts
                        .iter()
                        .filter(|a| a.kind == AlertKind::Down)
                        .count(),
                    recovery: self
                        .alerts
                        .iter()
                        .filter(|a| a.kind == AlertKind::Recovery)
                        .count(),
                    unacknowledged: self.alerts.iter().filter(|a| !a.acknowledged).count(),
                };
                let _ = respond_to.send(stats);
            }

            AlertCommand::Shutdown => {
                debug!("received shutdown command");
                return true;
            }
        }

        false
    }

    /// Drop alerts older than the given number of days, returning the count
    fn cleanup(&mut self, older_than_days: u32) -> usize {
        let cutoff = Utc::now() - Duration::days(older_than_days as i64);
        let before = self.alerts.len();
        self.alerts.retain(|alert| alert.created_at >= cutoff);
        before - self.alerts.len()
    }
}

/// Handle for controlling the AlertActor
#[derive(Clone)]
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
}

impl AlertHandle {
    /// Spawn a new alert actor
    ///
    /// # Arguments
    /// - `event_rx`: broadcast receiver for registry events
    /// - `notifier`: optional webhook target for new alerts
    /// - `retention_days`: age after which alerts are removed automatically
    pub fn spawn(
        event_rx: broadcast::Receiver<RegistryEvent>,
        notifier: Option<WebhookNotifier>,
        retention_days: Option<u32>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = AlertActor::new(cmd_rx, event_rx, notifier, retention_days);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Get the most recent alerts, newest first
    pub async fn recent(&self, limit: usize) -> Vec<Alert> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AlertCommand::Recent {
                limit,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return vec![];
        }

        rx.await.unwrap_or_default()
    }

    /// Acknowledge a single alert; returns false if the id is unknown
    pub async fn acknowledge(&self, alert_id: u64) -> bool {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AlertCommand::Acknowledge {
                alert_id,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Acknowledge every unacknowledged alert; returns the count
    pub async fn acknowledge_all(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AlertCommand::AcknowledgeAll { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or(0)
    }

    /// Delete alerts older than the given number of days; returns the count
    pub async fn cleanup(&self, older_than_days: u32) -> usize {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AlertCommand::Cleanup {
                older_than_days,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or(0)
    }

    /// Get aggregate alert statistics
    pub async fn stats(&self) -> AlertStats {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(AlertCommand::GetStats { respond_to: tx })
            .await
            .is_err()
        {
            return AlertStats::default();
        }

        rx.await.unwrap_or_default()
    }

    /// Shutdown the alert actor
    pub async fn shutdown(&self) {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
    }
}
