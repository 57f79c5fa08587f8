//! # Backoff policy for the instantiation scan loop.
//!
//! [`BackoffPolicy`] controls how long the loop sleeps between scans when
//! nothing is instantiable (hardware absent, dependencies not yet alive, or
//! the whole graph already up). It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for idle round `n` is computed as `first × factor^n`, clamped to
//! `max`, then jitter is applied. Because the base delay is derived purely
//! from the round number, jitter output never feeds back into subsequent
//! calculations. The round counter resets whenever a component comes up, so a
//! rig that makes progress is probed eagerly while a fully-idle (or
//! fully-alive) rig settles at the `max` poll interval.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use rigvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! // Round 0 — uses 'first' (500ms)
//! assert_eq!(backoff.next(0), Duration::from_millis(500));
//!
//! // Round 2 — first × factor^2 = 2s
//! assert_eq!(backoff.next(2), Duration::from_secs(2));
//!
//! // Round 10 — 500ms × 2^10 = 512s → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Scan backoff policy.
///
/// Encapsulates parameters that determine how the idle-scan delay grows:
/// - [`BackoffPolicy::factor`] — multiplicative growth factor;
/// - [`BackoffPolicy::first`] — the initial delay;
/// - [`BackoffPolicy::max`] — the maximum delay cap (the steady poll interval).
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay after the first empty scan.
    pub first: Duration,
    /// Maximum delay cap; also the steady-state poll interval once the graph
    /// is fully alive or permanently stuck on absent hardware.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to spread simultaneous hardware re-probes.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 1s`;
    /// - `max = 10s` (the steady poll interval);
    /// - `factor = 2.0`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given idle round (0-indexed).
    ///
    /// The base delay is `first × factor^round`, clamped to
    /// [`BackoffPolicy::max`]. Jitter is applied to the clamped base; the
    /// result is never fed back into subsequent calculations.
    ///
    /// # Notes
    /// - `factor == 1.0` keeps the delay constant at `first` (up to `max`).
    /// - Overflowing or non-finite intermediate values clamp to `max`.
    pub fn next(&self, round: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let clamped_exp = round.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_s: u64, factor: f64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_secs(max_s),
            factor,
            jitter,
        }
    }

    #[test]
    fn test_round_zero_returns_first() {
        let p = policy(100, 30, 2.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let p = policy(100, 30, 2.0, JitterPolicy::None);
        assert_eq!(p.next(1), Duration::from_millis(200));
        assert_eq!(p.next(2), Duration::from_millis(400));
        assert_eq!(p.next(3), Duration::from_millis(800));
    }

    #[test]
    fn test_constant_factor() {
        let p = policy(500, 30, 1.0, JitterPolicy::None);
        for round in 0..10 {
            assert_eq!(p.next(round), Duration::from_millis(500));
        }
    }

    #[test]
    fn test_clamped_to_max() {
        let p = policy(100, 1, 2.0, JitterPolicy::None);
        assert_eq!(p.next(10), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let p = policy(10_000, 5, 2.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_equal_jitter_keeps_half_of_base() {
        let p = policy(100, 30, 2.0, JitterPolicy::Equal);
        for round in 0..15 {
            let base_ms = (100.0 * 2.0f64.powi(round as i32)).min(30_000.0);
            let delay = p.next(round);
            assert!(delay >= Duration::from_millis((base_ms / 2.0) as u64));
            assert!(delay <= Duration::from_millis(base_ms as u64));
        }
    }

    #[test]
    fn test_huge_round_clamps_to_max() {
        let p = policy(100, 60, 2.0, JitterPolicy::None);
        assert_eq!(p.next(u32::MAX), Duration::from_secs(60));
    }
}
