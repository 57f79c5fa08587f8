//! # Status registry: alive components and ghosts.
//!
//! Maintains the authoritative state of which declared components are
//! currently alive and which are still ghosts (not yet running), and with
//! what status.
//!
//! ## Architecture
//! ```text
//! Starter (only writer while running) ──► StatusRegistry ──► Arc<RegistryView>
//! Terminator (writer once Starter         (clone-edit-swap)      │
//!             is confirmed stopped)                              ▼
//!                                            readers: Starter scans, status
//!                                            UIs, Terminator bootstrap
//! ```
//!
//! ## Rules
//! - **Copy-then-publish**: every mutation clones the current view, edits the
//!   clone, and swaps it in as a fresh `Arc`. A reader never observes a
//!   half-updated collection; a held snapshot stays frozen.
//! - **Single writer**: only the instantiation loop mutates while it runs;
//!   the termination engine takes over only after the loop is confirmed
//!   stopped. The lock is there for the swap, not for coordination.
//! - **Conservation**: alive names ∪ ghost names == declared names, always,
//!   and the two sets are disjoint. Extra (undeclared) delegated children are
//!   added to `alive` on top of the declared set.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::graph::ComponentRef;

/// Status of a declared component that is not currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GhostStatus {
    /// Not yet attempted (or waiting on dependencies).
    Unloaded,
    /// An instantiation attempt is in flight.
    Starting,
    /// The last instantiation attempt failed with this error.
    Failed(Arc<str>),
}

/// Immutable snapshot of the registry: the single source of truth for any
/// status observer.
#[derive(Clone, Default)]
pub struct RegistryView {
    /// Currently running components by name.
    pub alive: HashMap<String, ComponentRef>,
    /// Declared-but-not-running components by name.
    pub ghosts: HashMap<String, GhostStatus>,
}

impl RegistryView {
    /// Names of currently alive components.
    pub fn alive_names(&self) -> HashSet<String> {
        self.alive.keys().cloned().collect()
    }

    /// True once every declared component is alive.
    pub fn is_fully_alive(&self) -> bool {
        self.ghosts.is_empty()
    }
}

/// Tracks alive/ghost state for every declared component name.
pub struct StatusRegistry {
    view: RwLock<Arc<RegistryView>>,
}

impl StatusRegistry {
    /// Creates a registry with every declared name an `Unloaded` ghost.
    pub fn new(declared: impl IntoIterator<Item = String>) -> Self {
        let ghosts = declared
            .into_iter()
            .map(|name| (name, GhostStatus::Unloaded))
            .collect();
        Self {
            view: RwLock::new(Arc::new(RegistryView {
                alive: HashMap::new(),
                ghosts,
            })),
        }
    }

    /// Returns the current view. Cheap; the snapshot never changes under the
    /// caller.
    pub fn snapshot(&self) -> Arc<RegistryView> {
        Arc::clone(&self.view.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Marks a ghost as having an instantiation attempt in flight.
    pub fn mark_starting(&self, name: &str) {
        self.publish(|view| {
            if let Some(status) = view.ghosts.get_mut(name) {
                *status = GhostStatus::Starting;
            }
        });
    }

    /// Downgrades a ghost back to a recorded failure.
    pub fn mark_failed(&self, name: &str, reason: &str) {
        self.publish(|view| {
            if let Some(status) = view.ghosts.get_mut(name) {
                *status = GhostStatus::Failed(Arc::from(reason));
            }
        });
    }

    /// Atomically moves a component and all its delegated children from
    /// ghosts to alive.
    pub fn mark_alive(&self, component: ComponentRef, children: &[ComponentRef]) {
        self.publish(|view| {
            for c in std::iter::once(&component).chain(children.iter()) {
                let name = c.name().to_string();
                view.ghosts.remove(&name);
                view.alive.insert(name, Arc::clone(c));
            }
        });
    }

    /// Moves terminated components back to `Unloaded` ghosts.
    ///
    /// Undeclared extra children simply leave `alive`; they have no ghost
    /// entry to return to.
    pub fn mark_terminated(&self, names: &[String], declared: &HashSet<String>) {
        self.publish(|view| {
            for name in names {
                if view.alive.remove(name).is_some() && declared.contains(name) {
                    view.ghosts.insert(name.clone(), GhostStatus::Unloaded);
                }
            }
        });
    }

    /// Clone-edit-swap: applies `edit` to a copy of the current view and
    /// publishes the copy.
    fn publish(&self, edit: impl FnOnce(&mut RegistryView)) {
        let mut guard = self.view.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        edit(&mut next);
        *guard = Arc::new(next);
    }
}
