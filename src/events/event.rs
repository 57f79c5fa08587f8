//! # Runtime events emitted by the container, starter, terminator and tracker.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Startup events**: component instantiation flow (starting, started, failed)
//! - **Shutdown events**: termination progress and stalls
//! - **Settings events**: persistent-document faults
//! - **Subscriber events**: fan-out faults (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! component name, reasons, attempt counters and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use rigvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ComponentFailed)
//!     .with_component("cam")
//!     .with_reason("hardware unavailable: no answer")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::ComponentFailed);
//! assert_eq!(ev.component.as_deref(), Some("cam"));
//! assert_eq!(ev.attempt, Some(2));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Startup events ===
    /// A component is about to be instantiated.
    ///
    /// Sets:
    /// - `component`: component name
    /// - `attempt`: attempt number (1-based, monotonic per name)
    ComponentStarting,

    /// A component (or one of its delegated children) became alive.
    ///
    /// Sets:
    /// - `component`: component name
    ComponentStarted,

    /// Instantiation failed with a recoverable hardware error; the component
    /// stays a ghost and is retried after the backoff window.
    ///
    /// Sets:
    /// - `component`: component name
    /// - `attempt`: attempt number
    /// - `reason`: failure message
    ComponentFailed,

    /// A component came up with a child that is not declared in the graph.
    /// Accepted, but worth a look at the description document.
    ///
    /// Sets:
    /// - `component`: the unexpected child's name
    /// - `reason`: which creator produced it
    UnexpectedChild,

    /// Nothing is instantiable right now; the scan loop sleeps before the
    /// next probe.
    ///
    /// Sets:
    /// - `delay_ms`: sleep before the next scan
    ScanBackoff,

    /// The instantiation loop exited because it was asked to stop.
    StarterStopped,

    /// The instantiation loop hit a fatal (non-hardware) error and will never
    /// run again; full container shutdown follows.
    ///
    /// Sets:
    /// - `component`: the component whose instantiation was fatal
    /// - `reason`: fatal error message
    StarterDead,

    /// The instantiation loop did not stop within the bounded join window;
    /// shutdown proceeds without waiting for it.
    ///
    /// Sets:
    /// - `reason`: how long the container waited
    StarterStuck,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or `terminate()` called).
    ShutdownRequested,

    /// A component finished terminating (also published for delegated
    /// children as they go down with their creator).
    ///
    /// Sets:
    /// - `component`: component name
    ComponentTerminated,

    /// Terminating a component or sub-container failed; the failure is
    /// swallowed and the component is treated as terminated.
    ///
    /// Sets:
    /// - `component`: component name
    /// - `reason`: failure or panic message
    TerminateFailed,

    /// Every remaining component still has a live dependent (cycle or stuck
    /// dependent); one component is forced to keep shutdown moving.
    ///
    /// Sets:
    /// - `component`: the forced component
    /// - `reason`: explanation
    TerminationStalled,

    /// The whole graph, leftover sub-containers and the root are down.
    AllTerminated,

    // === Settings events ===
    /// A persistent property/metadata name is missing on a component, or the
    /// document rewrite failed. Logged and skipped, never fatal.
    ///
    /// Sets:
    /// - `component`: component name (when known)
    /// - `reason`: what went wrong
    SettingsError,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the component (or subscriber), if applicable.
    pub component: Option<Arc<str>>,
    /// Human-readable reason (errors, stall details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before the next scan in milliseconds (compact).
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    /// Attaches a component name.
    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
