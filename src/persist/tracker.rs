//! # Persistent settings tracker.
//!
//! Mirrors designated properties and metadata of alive components into the
//! [`SettingsDocument`], rewriting the document wholesale on every change and
//! at shutdown.
//!
//! ## Architecture
//! ```text
//! Starter ──track(component, fields)──► SettingsTracker
//!                                         ├─ initial property reads ─► doc + save
//!                                         ├─ one watcher task per property:
//!                                         │    watch::Receiver ─► record ─► save
//!                                         └─ metadata names registered for refresh
//!
//! Starter (on any component up) ──refresh_metadata()──► re-read + save if changed
//! Container (at shutdown)       ──flush_all()─────────► re-read + forced save
//! ```
//!
//! ## Rules
//! - Property changes are pushed by drivers on **their** tasks; the document
//!   is behind a `Mutex` and the rewrite path never holds it across `.await`.
//! - Metadata has no native change notification; it is re-read whenever a
//!   component becomes alive, and at shutdown.
//! - A missing property/metadata name is logged ([`EventKind::SettingsError`])
//!   and skipped, never fatal; so is a failed rewrite.
//! - With no path configured the tracker is memory-only (save is a no-op).

use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::error::PersistError;
use crate::events::{Bus, Event, EventKind};
use crate::graph::{ComponentRef, PersistentFields};
use crate::persist::document::SettingsDocument;

use std::sync::Arc;
use tokio::sync::watch;

/// One component registered for scheduled metadata re-reads.
struct TrackedComponent {
    component: ComponentRef,
    metadata: Vec<String>,
}

/// Mirrors tracked component values into the durable settings document.
///
/// ### Responsibilities
/// - Initial mirror of each designated property/metadata value on `track`
/// - One watcher task per property, recording every change
/// - Scheduled metadata re-reads (`refresh_metadata`)
/// - Forced synchronous rewrite before shutdown completes (`flush_all`)
pub struct SettingsTracker {
    path: Option<PathBuf>,
    doc: Mutex<SettingsDocument>,
    tracked: Mutex<Vec<TrackedComponent>>,
    bus: Bus,
    token: CancellationToken,
}

impl SettingsTracker {
    /// Loads the document (if a path is configured) and creates the tracker.
    ///
    /// `token` stops the property watcher tasks; cancel it once the container
    /// is down.
    pub fn load(
        path: Option<PathBuf>,
        bus: Bus,
        token: CancellationToken,
    ) -> Result<Arc<Self>, PersistError> {
        let doc = match &path {
            Some(p) => SettingsDocument::load_or_create(p)?,
            None => SettingsDocument::new(),
        };
        Ok(Arc::new(Self {
            path,
            doc: Mutex::new(doc),
            tracked: Mutex::new(Vec::new()),
            bus,
            token,
        }))
    }

    /// Starts tracking a newly alive component.
    ///
    /// Reads each designated property now, records it, and subscribes to
    /// future changes; registers each designated metadata key for the
    /// scheduled re-reads. One full rewrite at the end covers the initial
    /// values.
    pub fn track(self: &Arc<Self>, component: ComponentRef, fields: PersistentFields) {
        let name = component.name().to_string();

        for prop in &fields.properties {
            let current = component.property(prop);
            let rx = component.watch_property(prop);

            if current.is_none() && rx.is_none() {
                self.settings_error(
                    &name,
                    format!("component has no property '{prop}'; not persisted"),
                );
                continue;
            }

            if let Some(value) = current {
                self.record_unsaved(&name, prop, value);
            }
            match rx {
                Some(rx) => self.spawn_watcher(name.clone(), prop.clone(), rx),
                None => self.settings_error(
                    &name,
                    format!("property '{prop}' has no change notification; storing initial value only"),
                ),
            }
        }

        let mut registered = Vec::new();
        for meta in &fields.metadata {
            match component.metadata(meta) {
                Some(value) => {
                    let mut doc = self.lock_doc();
                    doc.set_metadata(&name, meta, value);
                    registered.push(meta.clone());
                }
                None => self.settings_error(
                    &name,
                    format!("component has no metadata '{meta}'; not persisted"),
                ),
            }
        }

        if !registered.is_empty() {
            self.lock_tracked().push(TrackedComponent {
                component,
                metadata: registered,
            });
        }

        self.save();
    }

    /// Re-reads every registered metadata value and rewrites the document if
    /// anything changed. Called whenever a component becomes alive.
    pub fn refresh_metadata(&self) {
        if self.refresh_metadata_values() {
            self.save();
        }
    }

    /// Forces a synchronous full rewrite, after a final metadata re-read.
    ///
    /// Must run before the container considers shutdown complete; safe to
    /// call multiple times.
    pub fn flush_all(&self) {
        self.refresh_metadata_values();
        self.save();
    }

    /// Returns a copy of the current in-memory document.
    pub fn document(&self) -> SettingsDocument {
        self.lock_doc().clone()
    }

    /// Re-reads metadata into the document; returns whether anything changed.
    fn refresh_metadata_values(&self) -> bool {
        let tracked = self.lock_tracked();
        let mut changed = false;
        let mut doc = self.lock_doc();
        for entry in tracked.iter() {
            let name = entry.component.name().to_string();
            for meta in &entry.metadata {
                let Some(value) = entry.component.metadata(meta) else {
                    // Was present at registration; driver may be mid-teardown.
                    continue;
                };
                if doc.metadata(&name, meta) != Some(&value) {
                    doc.set_metadata(&name, meta, value);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Records one property value and rewrites the document.
    fn record_property(&self, component: &str, prop: &str, value: Value) {
        self.record_unsaved(component, prop, value);
        self.save();
    }

    fn record_unsaved(&self, component: &str, prop: &str, value: Value) {
        let mut doc = self.lock_doc();
        doc.set_property(component, prop, value);
    }

    /// Rewrites the whole document to disk (no-op when memory-only).
    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let doc = self.lock_doc().clone();
        if let Err(e) = doc.save(path) {
            self.bus.publish(
                Event::new(EventKind::SettingsError)
                    .with_reason(format!("rewriting {}: {e}", path.display())),
            );
        }
    }

    fn spawn_watcher(self: &Arc<Self>, component: String, prop: String, mut rx: watch::Receiver<Value>) {
        let tracker = Arc::clone(self);
        let token = self.token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = rx.changed() => {
                        // Err means the driver dropped the sender (component down).
                        if changed.is_err() {
                            break;
                        }
                        let value = rx.borrow_and_update().clone();
                        tracker.record_property(&component, &prop, value);
                    }
                }
            }
        });
    }

    fn settings_error(&self, component: &str, reason: String) {
        self.bus.publish(
            Event::new(EventKind::SettingsError)
                .with_component(component)
                .with_reason(reason),
        );
    }

    fn lock_doc(&self) -> std::sync::MutexGuard<'_, SettingsDocument> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tracked(&self) -> std::sync::MutexGuard<'_, Vec<TrackedComponent>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeComponent;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fields(props: &[&str], metas: &[&str]) -> PersistentFields {
        PersistentFields {
            properties: props.iter().map(|s| s.to_string()).collect(),
            metadata: metas.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_track_mirrors_initial_values_to_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let tracker = SettingsTracker::load(Some(path.clone()), bus, token).unwrap();

        let cam = FakeComponent::build("cam")
            .with_property("exposure", json!(0.25))
            .with_metadata("pixel_size", json!(6.5))
            .into_ref();
        tracker.track(cam, fields(&["exposure"], &["pixel_size"]));

        let on_disk = SettingsDocument::from_file(&path).unwrap();
        assert_eq!(on_disk.property("cam", "exposure"), Some(&json!(0.25)));
        assert_eq!(on_disk.metadata("cam", "pixel_size"), Some(&json!(6.5)));
    }

    #[tokio::test]
    async fn test_property_change_rewrites_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let tracker = SettingsTracker::load(Some(path.clone()), bus, token.clone()).unwrap();

        let cam = FakeComponent::build("cam")
            .with_property("exposure", json!(0.25))
            .into_fake();
        tracker.track(cam.clone(), fields(&["exposure"], &[]));

        cam.set_property("exposure", json!(0.75));
        wait_for(|| {
            SettingsDocument::from_file(&path)
                .map(|d| d.property("cam", "exposure") == Some(&json!(0.75)))
                .unwrap_or(false)
        })
        .await;

        token.cancel();
    }

    #[tokio::test]
    async fn test_missing_property_is_logged_and_skipped() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let tracker = SettingsTracker::load(None, bus, token).unwrap();

        let cam = FakeComponent::build("cam").into_ref();
        tracker.track(cam, fields(&["nonexistent"], &[]));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::SettingsError);
        assert_eq!(ev.component.as_deref(), Some("cam"));
        assert!(tracker.document().entries.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_metadata_picks_up_changes() {
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let tracker = SettingsTracker::load(None, bus, token).unwrap();

        let stage = FakeComponent::build("stage")
            .with_metadata("calibration", json!(1.0))
            .into_fake();
        tracker.track(stage.clone(), fields(&[], &["calibration"]));

        stage.set_metadata("calibration", json!(2.0));
        tracker.refresh_metadata();
        assert_eq!(
            tracker.document().metadata("stage", "calibration"),
            Some(&json!(2.0))
        );
    }

    #[tokio::test]
    async fn test_flush_all_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let tracker = SettingsTracker::load(Some(path.clone()), bus, token).unwrap();

        let cam = FakeComponent::build("cam")
            .with_property("exposure", json!(0.25))
            .into_ref();
        tracker.track(cam, fields(&["exposure"], &[]));

        tracker.flush_all();
        let first = SettingsDocument::from_file(&path).unwrap();
        tracker.flush_all();
        let second = SettingsDocument::from_file(&path).unwrap();
        assert_eq!(first, second);
    }
}
