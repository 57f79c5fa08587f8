//! # Persistent settings document.
//!
//! One JSON document for the whole rig: an entry per component, each holding
//! the mirrored `properties` and `metadata` values. The document is loaded
//! once at startup and rewritten **wholesale** (never diffed) on every
//! tracked change and at shutdown, so the file on disk is always a complete,
//! self-consistent snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PersistError;

/// Mirrored values of a single component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentSettings {
    /// Property values by property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    /// Metadata values by metadata key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// The whole-rig settings document: component name → mirrored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsDocument {
    /// Entries keyed by component name.
    #[serde(flatten)]
    pub entries: BTreeMap<String, ComponentSettings>,
}

impl SettingsDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the document from a file.
    pub fn from_file(path: &Path) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        let doc: SettingsDocument = serde_json::from_str(&content)?;
        Ok(doc)
    }

    /// Loads the document, or creates an empty one if the file doesn't exist.
    pub fn load_or_create(path: &Path) -> Result<Self, PersistError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Rewrites the document to a file, fully replacing previous contents.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Records a property value under `component`.
    pub fn set_property(&mut self, component: &str, name: &str, value: Value) {
        self.entries
            .entry(component.to_string())
            .or_default()
            .properties
            .insert(name.to_string(), value);
    }

    /// Records a metadata value under `component`.
    pub fn set_metadata(&mut self, component: &str, name: &str, value: Value) {
        self.entries
            .entry(component.to_string())
            .or_default()
            .metadata
            .insert(name.to_string(), value);
    }

    /// Reads a recorded property value.
    pub fn property(&self, component: &str, name: &str) -> Option<&Value> {
        self.entries.get(component)?.properties.get(name)
    }

    /// Reads a recorded metadata value.
    pub fn metadata(&self, component: &str, name: &str) -> Option<&Value> {
        self.entries.get(component)?.metadata.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");

        let mut doc = SettingsDocument::new();
        doc.set_property("cam", "exposure", json!(0.25));
        doc.set_metadata("stage", "calibration", json!({"x": 1.5, "y": -0.5}));
        doc.save(&path).unwrap();

        let loaded = SettingsDocument::from_file(&path).unwrap();
        assert_eq!(loaded.property("cam", "exposure"), Some(&json!(0.25)));
        assert_eq!(
            loaded.metadata("stage", "calibration"),
            Some(&json!({"x": 1.5, "y": -0.5}))
        );
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_load_or_create_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        let doc = SettingsDocument::load_or_create(&path).unwrap();
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn test_save_is_a_full_replace() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");

        let mut doc = SettingsDocument::new();
        doc.set_property("cam", "exposure", json!(0.25));
        doc.save(&path).unwrap();

        // A later save without the entry must not resurrect it from disk.
        let doc = SettingsDocument::new();
        doc.save(&path).unwrap();
        let loaded = SettingsDocument::from_file(&path).unwrap();
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn test_set_property_overwrites() {
        let mut doc = SettingsDocument::new();
        doc.set_property("cam", "exposure", json!(0.25));
        doc.set_property("cam", "exposure", json!(0.5));
        assert_eq!(doc.property("cam", "exposure"), Some(&json!(0.5)));
    }
}
