//! # Component abstraction.
//!
//! This module defines the [`Component`] trait — the only view the
//! control-plane has of a running hardware or virtual unit — and the
//! [`SubContainer`] trait for components that run behind an isolation
//! boundary. The common handle types are [`ComponentRef`] and
//! [`SubContainerRef`], `Arc`-backed trait objects suitable for sharing
//! across the runtime.
//!
//! Concrete device drivers live behind the external
//! [`Instantiator`](crate::Instantiator); the core never sees device types,
//! only names, dependencies, children and the persistence seams.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::TerminateError;

/// Shared handle to a running component.
pub type ComponentRef = Arc<dyn Component>;

/// Shared handle to a per-component isolation container.
pub type SubContainerRef = Arc<dyn SubContainer>;

/// # A running hardware/virtual unit participating in the dependency graph.
///
/// A `Component` has a stable [`name`](Component::name), knows which other
/// components it [requires](Component::dependencies) and which it
/// [created](Component::children) as a side effect of its own instantiation
/// (delegated creation). A component owns its children for termination
/// purposes (they terminate together, children first); it never owns its
/// dependencies.
///
/// ## Property and metadata seams
/// Designated properties are mirrored into the persistent settings document:
/// [`property`](Component::property) reads the current value and
/// [`watch_property`](Component::watch_property) yields a change stream
/// (drivers publish on their own tasks). Metadata has no native change
/// notification and is only read via [`metadata`](Component::metadata) on a
/// schedule.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use rigvisor::{Component, TerminateError};
///
/// struct Lamp;
///
/// #[async_trait]
/// impl Component for Lamp {
///     fn name(&self) -> &str { "lamp" }
///     fn dependencies(&self) -> Vec<String> { vec!["psu".into()] }
///     fn children(&self) -> Vec<rigvisor::ComponentRef> { Vec::new() }
///
///     async fn terminate(&self) -> Result<(), TerminateError> {
///         // switch off, release the port...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Returns the stable, unique component name.
    fn name(&self) -> &str;

    /// Names of the components this one requires to be alive before it can
    /// start, and which must outlive it during shutdown.
    fn dependencies(&self) -> Vec<String>;

    /// Direct delegated children, created as a side effect of creating this
    /// component. Owned for termination purposes.
    fn children(&self) -> Vec<ComponentRef>;

    /// Name of the component controlling this one's power, if any. Treated
    /// as a dependency during shutdown so power is never cut under a
    /// component that is still going down.
    fn power_supplier(&self) -> Option<String> {
        None
    }

    /// Brings the component down. Called only after every dependent and
    /// every child is already down.
    async fn terminate(&self) -> Result<(), TerminateError>;

    /// Reads the current value of a named property, if the component has it.
    fn property(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Subscribes to future changes of a named property, if the component
    /// has it. The receiver's current value is the property's current value.
    fn watch_property(&self, name: &str) -> Option<watch::Receiver<Value>> {
        let _ = name;
        None
    }

    /// Reads the current value of a named metadata key, if the component
    /// has it.
    fn metadata(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }
}

/// # An isolation boundary in which one component (and its delegated
/// children) runs.
///
/// Torn down by the termination engine once its component is already down;
/// failures are logged and swallowed like any other termination error.
#[async_trait]
pub trait SubContainer: Send + Sync + 'static {
    /// Name of the component this container isolates.
    fn name(&self) -> &str;

    /// Tears the container down.
    async fn terminate(&self) -> Result<(), TerminateError>;
}
