//! Helper functions for integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use netpulse::ProbeOutcome;
use netpulse::config::MonitorConfig;
use netpulse::prober::Prober;

pub fn up(latency_ms: f64) -> ProbeOutcome {
    ProbeOutcome::Up { latency_ms }
}

pub fn down() -> ProbeOutcome {
    ProbeOutcome::Down
}

/// A monitor config whose interval is long enough that only explicit
/// `probe_now` calls drive cycles during a test
pub fn test_monitor_config() -> MonitorConfig {
    MonitorConfig {
        ping_interval_secs: 3600,
        probe_timeout_secs: 1,
        max_concurrent_probes: 16,
        history_limit: 100,
        prober: Default::default(),
    }
}

/// Prober that replays a scripted sequence of outcomes per address
///
/// Once a script runs dry (or for unscripted addresses) every probe
/// reports up with a fixed latency.
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, address: &str, outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), outcomes.into_iter().collect());
        self
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> Result<ProbeOutcome> {
        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(ProbeOutcome::Up { latency_ms: 10.0 });

        Ok(outcome)
    }
}
