//! # Instantiator seam and the graph adapter over it.
//!
//! The [`Instantiator`] trait is the boundary to the external collaborator
//! that owns the parsed hardware description and the device drivers: it
//! answers which components are instantiable, builds them, and reports their
//! delegated children and persistence designations. The control-plane never
//! sees concrete device types through this seam.
//!
//! [`GraphAdapter`] is the thin wrapper the runtime actually calls: it adds
//! the scan-side filtering (already-alive and recently-failed names) and a
//! deterministic ordering for the instantiation loop.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::InstantiateError;
use crate::graph::component::{ComponentRef, SubContainerRef};

/// Persistence designations of one component: which property and metadata
/// names are mirrored into the settings document.
#[derive(Debug, Clone, Default)]
pub struct PersistentFields {
    /// Property names to mirror (change-notified).
    pub properties: Vec<String>,
    /// Metadata keys to mirror (re-read on a schedule).
    pub metadata: Vec<String>,
}

impl PersistentFields {
    /// Returns true if the component designates nothing for persistence.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.metadata.is_empty()
    }
}

/// # External collaborator that owns the graph and the drivers.
///
/// Implementations hold the parsed
/// [`GraphDescriptor`](crate::GraphDescriptor) and know how to construct the
/// concrete driver for each declared name.
///
/// ## Rules
/// - `instantiate(name)` may block for arbitrarily long (real hardware).
/// - Errors are classified: [`InstantiateError::Hardware`] is recoverable,
///   anything else aborts the whole container.
/// - `children_of` reports **all** components transitively created as a side
///   effect of instantiating the given component.
#[async_trait]
pub trait Instantiator: Send + Sync + 'static {
    /// All declared component names (root excluded). Used to bootstrap the
    /// status registry.
    fn declared(&self) -> HashSet<String>;

    /// Names instantiable right now, given the set of currently alive names.
    fn ready(&self, alive: &HashSet<String>) -> HashSet<String>;

    /// Builds the driver for `name` and returns the running component.
    async fn instantiate(&self, name: &str) -> Result<ComponentRef, InstantiateError>;

    /// All components transitively created as a side effect of instantiating
    /// `component`.
    fn children_of(&self, component: &ComponentRef) -> Vec<ComponentRef>;

    /// The children the description document declares for `name`
    /// (transitively).
    fn expected_children(&self, name: &str) -> HashSet<String>;

    /// Persistence designations for `name`.
    fn persistent_fields(&self, name: &str) -> PersistentFields;

    /// The isolation container `name` runs in, if any. Terminated once the
    /// component is down.
    fn sub_container(&self, name: &str) -> Option<SubContainerRef> {
        let _ = name;
        None
    }
}

/// Thin adapter between the runtime and the external [`Instantiator`].
///
/// Adds what the instantiation loop needs on top of the raw seam: exclusion
/// of already-alive and recently-failed names from the ready set, and a
/// sorted scan order so behavior is deterministic under test.
#[derive(Clone)]
pub struct GraphAdapter {
    inner: Arc<dyn Instantiator>,
}

impl GraphAdapter {
    /// Wraps an external instantiator.
    pub fn new(inner: Arc<dyn Instantiator>) -> Self {
        Self { inner }
    }

    /// All declared component names (root excluded).
    pub fn declared(&self) -> HashSet<String> {
        self.inner.declared()
    }

    /// Names to attempt this scan: ready per the collaborator, minus names
    /// already alive and names in the recently-failed window. Sorted.
    pub fn startable(&self, alive: &HashSet<String>, excluded: &HashSet<String>) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .ready(alive)
            .into_iter()
            .filter(|name| !alive.contains(name) && !excluded.contains(name))
            .collect();
        names.sort_unstable();
        names
    }

    /// See [`Instantiator::instantiate`].
    pub async fn instantiate(&self, name: &str) -> Result<ComponentRef, InstantiateError> {
        self.inner.instantiate(name).await
    }

    /// See [`Instantiator::children_of`].
    pub fn children_of(&self, component: &ComponentRef) -> Vec<ComponentRef> {
        self.inner.children_of(component)
    }

    /// See [`Instantiator::expected_children`].
    pub fn expected_children(&self, name: &str) -> HashSet<String> {
        self.inner.expected_children(name)
    }

    /// See [`Instantiator::persistent_fields`].
    pub fn persistent_fields(&self, name: &str) -> PersistentFields {
        self.inner.persistent_fields(name)
    }

    /// See [`Instantiator::sub_container`].
    pub fn sub_container(&self, name: &str) -> Option<SubContainerRef> {
        self.inner.sub_container(name)
    }
}
