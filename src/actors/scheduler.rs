//! SchedulerActor - Drives probe cycles on a fixed cadence
//!
//! Each cycle snapshots the registered devices, fans out one probe per
//! device, and folds every result back into the registry.
//!
//! ## Key Properties
//!
//! 1. **Bounded fan-out** - a semaphore caps concurrent probes, so a large
//!    fleet cannot exhaust sockets or tasks
//! 2. **Per-probe timeout** - every probe races a timeout; slow or
//!    unreachable hosts degrade to a failed result instead of stalling the
//!    cycle
//! 3. **No overlapping cycles** - cycles run inline in the actor loop and
//!    missed ticks are skipped, so a slow cycle delays rather than overlaps
//!    the next one
//! 4. **Error isolation** - one device's prober error never aborts the
//!    cycle for the others; the error becomes a failed probe result so
//!    statistics still advance
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → probe every device → apply results to registry
//!     ↑
//!     └─── Commands (ProbeNow, UpdateInterval, Shutdown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, instrument, trace, warn};

use crate::ProbeOutcome;
use crate::config::MonitorConfig;
use crate::prober::Prober;
use crate::registry::DeviceRegistry;

use super::messages::SchedulerCommand;

/// Delay before the first cycle, so operators get feedback shortly after
/// start instead of waiting a full interval
const INITIAL_PROBE_DELAY: Duration = Duration::from_secs(2);

/// Actor that probes all registered devices on a fixed cadence
pub struct SchedulerActor {
    registry: Arc<DeviceRegistry>,
    prober: Arc<dyn Prober>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SchedulerCommand>,

    /// Current probe cadence
    interval_duration: Duration,

    /// Upper bound applied to every single probe
    probe_timeout: Duration,

    /// Caps the number of in-flight probes per cycle
    fanout: Arc<Semaphore>,
}

impl SchedulerActor {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        prober: Arc<dyn Prober>,
        config: &MonitorConfig,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        Self {
            registry,
            prober,
            command_rx,
            interval_duration: Duration::from_secs(config.ping_interval_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            fanout: Arc::new(Semaphore::new(config.max_concurrent_probes)),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is
    /// closed. In-flight cycles drain before shutdown completes; their
    /// results for devices removed in the meantime are discarded.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting scheduler (interval: {:?}, probe timeout: {:?})",
            self.interval_duration, self.probe_timeout
        );

        let mut ticker = interval_at(
            Instant::now() + INITIAL_PROBE_DELAY,
            self.interval_duration,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Timer tick - run a probe cycle
                _ = ticker.tick() => {
                    self.probe_all().await;
                }

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::ProbeNow { respond_to } => {
                            debug!("received ProbeNow command");
                            self.probe_all().await;
                            let _ = respond_to.send(Ok(()));
                        }

                        SchedulerCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = interval_at(
                                Instant::now() + self.interval_duration,
                                self.interval_duration,
                            );
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                // Command channel closed - exit
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("scheduler stopped");
    }

    /// Run one probe cycle over all registered devices
    ///
    /// Results are applied as they arrive; devices removed mid-cycle have
    /// their late results discarded.
    #[instrument(skip(self))]
    async fn probe_all(&self) {
        let devices = self.registry.list().await;
        if devices.is_empty() {
            trace!("no devices to probe");
            return;
        }

        let total = devices.len();
        let started = Instant::now();

        let probes = devices.into_iter().map(|device| {
            let registry = Arc::clone(&self.registry);
            let prober = Arc::clone(&self.prober);
            let fanout = Arc::clone(&self.fanout);
            let probe_timeout = self.probe_timeout;

            async move {
                let outcome = {
                    let _permit = match fanout.acquire_owned().await {
                        Ok(permit) => permit,
                        // Only possible if the semaphore is closed mid-shutdown.
                        Err(_) => return false,
                    };

                    match timeout(probe_timeout, prober.probe(&device.address)).await {
                        Ok(Ok(outcome)) => outcome,
                        Ok(Err(e)) => {
                            warn!(
                                "{} ({}): probe error: {:#}",
                                device.label, device.address, e
                            );
                            ProbeOutcome::Down
                        }
                        Err(_) => {
                            warn!(
                                "{} ({}): probe timed out after {:?}",
                                device.label, device.address, probe_timeout
                            );
                            ProbeOutcome::Down
                        }
                    }
                };

                match registry
                    .apply_probe_result(device.id, outcome, Utc::now())
                    .await
                {
                    Ok(_) => outcome.success(),
                    Err(e) => {
                        debug!("{}: discarding probe result: {e}", device.label);
                        false
                    }
                }
            }
        });

        let results = join_all(probes).await;
        let successful = results.iter().filter(|up| **up).count();

        debug!(
            "probe cycle complete: {successful} up, {} down of {total} devices in {:?}",
            total - successful,
            started.elapsed()
        );

        if started.elapsed() >= self.interval_duration {
            warn!("probe cycle exceeded the interval; skipping the missed tick");
        }
    }
}

/// Handle for controlling the SchedulerActor
///
/// Can be cloned and shared across tasks.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn a new scheduler actor
    pub fn spawn(
        registry: Arc<DeviceRegistry>,
        prober: Arc<dyn Prober>,
        config: &MonitorConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SchedulerActor::new(registry, prober, config, cmd_rx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Trigger an immediate probe cycle, bypassing the interval timer
    pub async fn probe_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::ProbeNow { respond_to: tx })
            .await
            .context("failed to send ProbeNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Update the probe interval (restart semantics for config changes)
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(SchedulerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
