//! # Graph descriptor: the parsed, read-only component declarations.
//!
//! The hardware-description document is parsed by an external collaborator
//! into one [`ComponentDecl`] per declared component (the root excluded).
//! [`GraphDescriptor`] is the resulting read-only mapping, with the readiness
//! helper [`startable`](GraphDescriptor::startable) that `Instantiator`
//! implementations typically answer `ready()` with.
//!
//! ## Rules
//! - A component with a `creator` is a **delegated child**: it is never
//!   separately instantiable and becomes alive only with its creator.
//! - A component is startable once every declared dependency is alive.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One declared component: relationships and persistence designations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Names of components this one creates as a side effect of its own
    /// instantiation (delegated creation).
    #[serde(default)]
    pub children: Vec<String>,

    /// Names of components that must be alive before this one can start.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// The component that delegated-creates this one, if any.
    #[serde(default)]
    pub creator: Option<String>,

    /// The component controlling this one's power, if any.
    #[serde(default)]
    pub power_supplier: Option<String>,

    /// Property names whose values are mirrored into the persistent
    /// settings document.
    #[serde(default)]
    pub persistent_properties: Vec<String>,

    /// Metadata keys whose values are mirrored into the persistent settings
    /// document.
    #[serde(default)]
    pub persistent_metadata: Vec<String>,
}

/// Read-only mapping of declared component names to their declarations.
///
/// One entry per declared component except the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescriptor {
    decls: BTreeMap<String, ComponentDecl>,
}

impl GraphDescriptor {
    /// Builds a descriptor from parsed declarations.
    pub fn new(decls: BTreeMap<String, ComponentDecl>) -> Self {
        Self { decls }
    }

    /// All declared component names.
    pub fn declared(&self) -> HashSet<String> {
        self.decls.keys().cloned().collect()
    }

    /// The declaration for `name`, if declared.
    pub fn decl(&self, name: &str) -> Option<&ComponentDecl> {
        self.decls.get(name)
    }

    /// Expected (transitively delegated) children of `name`.
    pub fn expected_children(&self, name: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        let mut stack: Vec<&str> = match self.decls.get(name) {
            Some(decl) => decl.children.iter().map(String::as_str).collect(),
            None => return out,
        };
        while let Some(child) = stack.pop() {
            if !out.insert(child.to_string()) {
                continue;
            }
            if let Some(decl) = self.decls.get(child) {
                stack.extend(decl.children.iter().map(String::as_str));
            }
        }
        out
    }

    /// Names instantiable right now: declared, not alive, not a delegated
    /// child, with every declared dependency already alive.
    pub fn startable(&self, alive: &HashSet<String>) -> HashSet<String> {
        self.decls
            .iter()
            .filter(|(name, decl)| {
                !alive.contains(*name)
                    && decl.creator.is_none()
                    && decl.dependencies.iter().all(|dep| alive.contains(dep))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
