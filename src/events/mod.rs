//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the container, the
//! instantiation loop, the termination engine, the settings tracker and the
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Container`, `Starter`, `Terminator` pool workers,
//!   `SettingsTracker` watchers, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the container's subscriber listener (fans out to
//!   `SubscriberSet`) and any direct observer of [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
