//! Durable settings: document model and tracker.
//!
//! ## Contents
//! - [`SettingsDocument`], [`ComponentSettings`] the persisted key/value shape
//! - [`SettingsTracker`] mirrors live component values into the document
//!
//! The document is rewritten wholesale on every tracked change and flushed
//! once more before shutdown completes, so device-originated configuration
//! changes survive restarts without losing updates.

mod document;
mod tracker;

pub use document::{ComponentSettings, SettingsDocument};
pub use tracker::SettingsTracker;
