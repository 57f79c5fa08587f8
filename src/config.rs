//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the container runtime.
//!
//! ## Sentinel values
//! - `terminate_pool = 0` → unbounded termination parallelism (no semaphore)
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration for the container runtime.
///
/// Defines:
/// - **Scan pacing**: backoff between instantiation scans
/// - **Shutdown behavior**: bounded join for the instantiation loop,
///   termination pool width
/// - **Event system**: bus capacity for event delivery
///
/// ## Field semantics
/// - `scan_backoff`: delay policy when nothing is instantiable (max is the
///   steady poll interval)
/// - `stop_join`: how long shutdown waits for the instantiation loop before
///   proceeding without it (a blocked hardware call is never force-killed)
/// - `terminate_pool`: parallel termination width (`0` = unbounded)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Backoff policy for the instantiation loop's idle scans.
    pub scan_backoff: BackoffPolicy,

    /// Maximum time to wait for the instantiation loop to observe the stop
    /// signal during shutdown.
    ///
    /// A loop blocked inside a hardware call cannot be interrupted; after
    /// this window shutdown logs a warning and proceeds anyway.
    pub stop_join: Duration,

    /// Width of the bounded worker pool used for parallel termination waves.
    ///
    /// - `0` = unbounded (no semaphore)
    /// - `n > 0` = at most `n` components terminating simultaneously
    pub terminate_pool: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the termination pool width as an `Option`.
    ///
    /// - `None` → unbounded (no semaphore)
    /// - `Some(n)` → at most `n` concurrent terminations
    #[inline]
    pub fn terminate_pool_limit(&self) -> Option<usize> {
        if self.terminate_pool == 0 {
            None
        } else {
            Some(self.terminate_pool)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `scan_backoff = BackoffPolicy::default()` (1s → 10s, factor 2.0)
    /// - `stop_join = 10s`
    /// - `terminate_pool = 20`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            scan_backoff: BackoffPolicy::default(),
            stop_join: Duration::from_secs(10),
            terminate_pool: 20,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pool_means_unbounded() {
        let mut cfg = Config::default();
        cfg.terminate_pool = 0;
        assert_eq!(cfg.terminate_pool_limit(), None);
        cfg.terminate_pool = 20;
        assert_eq!(cfg.terminate_pool_limit(), Some(20));
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let mut cfg = Config::default();
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
