//! Probe capability
//!
//! A [`Prober`] answers a single question: is this address reachable right
//! now, and how long did the check take? Implementations are injected into
//! the scheduler, so tests can substitute a scripted fake and the aggregation
//! path never depends on real network I/O or randomness.
//!
//! An `Err` from a prober means the probe itself could not run (bad address,
//! socket error). The scheduler degrades both errors and timeouts to a failed
//! outcome, so the distinction only exists at this boundary.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tokio::net::TcpStream;
use tracing::trace;

use crate::ProbeOutcome;

#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single IPv4 address (dotted-quad) once.
    async fn probe(&self, address: &str) -> Result<ProbeOutcome>;
}

/// Probes reachability with a TCP connect to a fixed port.
///
/// Connection refused still proves the host answered, so only timeouts and
/// unreachable-network errors count as down. The connect has no timeout of
/// its own; the scheduler bounds every probe externally.
pub struct TcpProber {
    port: u16,
}

impl TcpProber {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &str) -> Result<ProbeOutcome> {
        let ip = Ipv4Addr::from_str(address)
            .with_context(|| format!("not an IPv4 address: {address}"))?;

        let start = Instant::now();
        let outcome = match TcpStream::connect((ip, self.port)).await {
            Ok(_) => ProbeOutcome::Up {
                latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => ProbeOutcome::Up {
                latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            Err(e) => {
                trace!("{address}: tcp probe failed: {e}");
                ProbeOutcome::Down
            }
        };

        Ok(outcome)
    }
}

/// Simulates probe outcomes without touching the network.
///
/// Each address gets a stable base latency derived from its octets (5-150 ms
/// band), with +-20 ms of jitter per probe and a configurable loss rate. The
/// simulated wire time is actually slept, so latencies line up with how long
/// the probe appeared to take.
pub struct SimulatedProber {
    loss_rate: f64,
}

impl SimulatedProber {
    pub fn new(loss_rate: f64) -> Self {
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
        }
    }

    /// Stable per-address base latency: sum of octets mapped into 5-150 ms.
    fn base_latency_ms(address: &str) -> f64 {
        let sum: u64 = address
            .split('.')
            .filter_map(|part| part.parse::<u64>().ok())
            .sum();
        (5 + sum % 145) as f64
    }
}

impl Default for SimulatedProber {
    fn default() -> Self {
        Self::new(0.05)
    }
}

#[async_trait]
impl Prober for SimulatedProber {
    async fn probe(&self, address: &str) -> Result<ProbeOutcome> {
        let (lost, jitter) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_bool(self.loss_rate),
                rng.gen_range(-20.0f64..20.0f64),
            )
        };

        if lost {
            return Ok(ProbeOutcome::Down);
        }

        let latency_ms = (Self::base_latency_ms(address) + jitter).max(1.0);
        tokio::time::sleep(std::time::Duration::from_millis(latency_ms as u64)).await;

        Ok(ProbeOutcome::Up { latency_ms })
    }
}
