//! Message types for actor communication
//!
//! Commands are request/response messages sent to a specific actor via its
//! mpsc channel; queries carry a oneshot sender for the reply. Registry
//! events (transitions, removals) are defined next to their producer in
//! [`crate::registry`].

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::Alert;

/// Commands that can be sent to the SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Trigger an immediate probe cycle (bypassing the interval timer)
    ///
    /// Used for manual refresh operations and testing.
    ProbeNow {
        /// Channel to send the result back
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },

    /// Update the probe interval
    ///
    /// Equivalent to a stop/start with the new cadence; used when the
    /// ping-interval setting changes.
    UpdateInterval {
        /// New interval in seconds
        interval_secs: u64,
    },

    /// Gracefully shut down the scheduler
    ///
    /// A cycle already in flight is allowed to drain first.
    Shutdown,
}

/// Commands that can be sent to the AlertActor
#[derive(Debug)]
pub enum AlertCommand {
    /// Get the most recent alerts, newest first
    Recent {
        limit: usize,
        respond_to: oneshot::Sender<Vec<Alert>>,
    },

    /// Acknowledge a single alert; replies false if the id is unknown
    Acknowledge {
        alert_id: u64,
        respond_to: oneshot::Sender<bool>,
    },

    /// Acknowledge every unacknowledged alert; replies with the count
    AcknowledgeAll { respond_to: oneshot::Sender<usize> },

    /// Delete alerts older than the given number of days; replies with the
    /// number removed
    Cleanup {
        older_than_days: u32,
        respond_to: oneshot::Sender<usize>,
    },

    /// Get aggregate alert statistics
    GetStats {
        respond_to: oneshot::Sender<AlertStats>,
    },

    /// Gracefully shut down the alert actor
    Shutdown,
}

/// Aggregate alert statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub down: usize,
    pub recovery: usize,
    pub unacknowledged: usize,
}
