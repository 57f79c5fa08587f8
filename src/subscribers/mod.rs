//! # Event subscribers for the container runtime.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery for
//! handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Contents
//! - [`Subscribe`] the extension point for custom handlers
//! - [`SubscriberSet`] bounded, panic-isolated fan-out
//! - [`LogWriter`] simple stdout logger (feature = "logging")
//!
//! The container wires the bus to the set: a single listener task receives
//! every event and emits it to all subscribers through their own bounded
//! queues; no publisher ever waits on a subscriber.

mod set;
mod subscriber;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
