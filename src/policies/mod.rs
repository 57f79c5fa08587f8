//! Scan pacing policies.
//!
//! This module groups the knobs that control **how long** the instantiation
//! loop waits between scans when nothing is instantiable.
//!
//! ## Contents
//! - [`BackoffPolicy`] how the idle-scan delay evolves (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to spread hardware re-probes
//!
//! ## Quick wiring
//! ```text
//! Config { scan_backoff: BackoffPolicy, .. }
//!      └─► core::starter::Starter uses:
//!           - backoff.next(idle_rounds) to schedule the next scan
//!           - idle_rounds resets whenever a component comes up
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1s, factor=2.0, max=10s, jitter=None.
//! - Consider `JitterPolicy::Equal` on rigs where many devices share a power
//!   domain and tend to reappear at the same moment.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
