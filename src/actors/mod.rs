//! Actor-based monitoring pipeline
//!
//! Long-running components run as independent tokio tasks communicating via
//! channels, each controlled through a cloneable handle.
//!
//! ## Architecture Overview
//!
//! ```text
//!   SchedulerActor ──probe──> Prober
//!        │
//!        └──apply_probe_result──> DeviceRegistry ──fold──> updated Device
//!                                      │
//!                                      │ broadcast (transitions, removals)
//!                                      ▼
//!                                 AlertActor ──> Alert records
//!                                      │              (recent / ack / cleanup)
//!                                      └──> WebhookNotifier (optional)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each actor has an mpsc command channel for control
//!    messages, with oneshot channels for request/response queries
//! 2. **Events**: the registry publishes [`crate::registry::RegistryEvent`]s
//!    on a broadcast channel for fan-out to interested actors

pub mod alert;
pub mod messages;
pub mod scheduler;
