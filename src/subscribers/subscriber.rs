//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging custom event
//! handlers (status UIs, metrics, alerting) into the container runtime.
//!
//! Each subscriber gets:
//! - a dedicated bounded queue and worker task (see
//!   [`SubscriberSet`](crate::SubscriberSet)),
//! - per-subscriber FIFO delivery,
//! - isolation from other subscribers (slow or panicking subscribers only
//!   affect their own queue).
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use rigvisor::{Event, EventKind, Subscribe};
//!
//! struct GhostAlarm;
//!
//! #[async_trait]
//! impl Subscribe for GhostAlarm {
//!     fn name(&self) -> &'static str { "ghost-alarm" }
//!
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ComponentFailed {
//!             // page someone...
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// # Receiver of runtime events.
///
/// Implementations observe the container's lifecycle stream: component
/// startup and failure, termination progress, settings faults. Handlers run
/// on a dedicated worker task per subscriber and should not block for long;
/// events arriving faster than the handler drains its queue are dropped (with
/// a [`SubscriberOverflow`](crate::EventKind::SubscriberOverflow) notice).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Stable subscriber name, used in overflow/panic events.
    fn name(&self) -> &'static str;

    /// Handles one event. Per-subscriber FIFO; cross-subscriber order is
    /// unspecified.
    async fn on_event(&self, event: &Event);

    /// Capacity of this subscriber's bounded queue (min 1).
    fn queue_capacity(&self) -> usize {
        256
    }
}
