//! # rigvisor
//!
//! **Rigvisor** is the lifecycle control-plane of a hardware-control backend.
//!
//! It owns a declared graph of components (devices, sub-devices, delegated
//! virtual components), brings them up in dependency order, keeps trying
//! through transient hardware failures, mirrors device-originated settings
//! into a durable document, and tears everything down safely in
//! reverse-dependency order. The crate is designed as a building block: the
//! description-document parser, the device drivers and the RPC layer that
//! exposes components to clients are external collaborators behind trait
//! seams.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//!     │ Instantiator │  │  Component   │  │ SubContainer │   (external:
//!     │ (drivers +   │  │ (trait view  │  │ (isolation   │    parser, drivers,
//!     │  parsed AST) │  │  of a unit)  │  │  boundary)   │    RPC layer)
//!     └──────┬───────┘  └──────────────┘  └──────────────┘
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Container (runtime orchestrator)                                 │
//! │  - Bus (broadcast events)                                         │
//! │  - StatusRegistry (alive/ghosts, copy-then-publish snapshots)     │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - SettingsTracker (durable property/metadata mirror)             │
//! └──────┬──────────────────────┬─────────────────────────┬───────────┘
//!        ▼                      ▼                         ▼
//! ┌──────────────┐      ┌───────────────┐        ┌────────────────┐
//! │   Starter    │      │  Terminator   │        │ settings       │
//! │ (scan loop:  │      │ (reverse-dep  │        │ watcher tasks  │
//! │  ready →     │      │  waves via    │        │ (one per       │
//! │  instantiate │      │  bounded pool)│        │  property)     │
//! │  → promote)  │      └───────────────┘        └────────────────┘
//! └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! ContainerBuilder ──► Container::run()
//!
//! loop (Starter):
//!   ├─► ready = Instantiator::ready(alive) \ recently_failed
//!   ├─► empty? sleep backoff.next(idle_rounds) (≤ 10s, cancellable),
//!   │          clear recently_failed, rescan
//!   └─► per name: mark Starting ─► instantiate(name)
//!         ├─ hardware error ──► ghost = Failed(err), quarantine, continue
//!         ├─ model error ─────► StarterDead ─► container shutdown (fatal)
//!         └─ Ok(component) ───► verify expected children
//!               ├─ missing child ─► fatal (as above)
//!               └─ promote component + children to alive,
//!                  track persistent fields, refresh metadata
//!
//! Container::terminate():   (idempotent; signal, fatal error, or caller)
//!   ├─► stop Starter (bounded join, warn + proceed on timeout)
//!   ├─► SettingsTracker::flush_all()
//!   ├─► Terminator: waves of zero-dependent components through the pool
//!   │     (dependents before dependencies, children before creators,
//!   │      power suppliers last; failures logged, never blocking)
//!   └─► leftover sub-containers ─► root ─► AllTerminated
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                      |
//! |-------------------|--------------------------------------------------------------------|-----------------------------------------|
//! | **Graph seams**   | External collaborator traits the core drives.                      | [`Instantiator`], [`Component`]         |
//! | **Status**        | Live alive/ghost view with frozen snapshots.                       | [`RegistryView`], [`GhostStatus`]       |
//! | **Persistence**   | Durable key/value mirror of designated fields.                     | [`SettingsDocument`], [`SettingsTracker`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, UIs).                | [`Subscribe`]                           |
//! | **Policies**      | Scan pacing between instantiation attempts.                        | [`BackoffPolicy`], [`JitterPolicy`]     |
//! | **Errors**        | Recoverable vs fatal instantiation, swallowed termination.         | [`InstantiateError`], [`RuntimeError`]  |
//! | **Configuration** | Centralized runtime settings.                                      | [`Config`]                              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::collections::HashSet;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use rigvisor::{
//!     Component, ComponentRef, Container, InstantiateError, Instantiator,
//!     PersistentFields, TerminateError,
//! };
//!
//! struct Cam;
//!
//! #[async_trait]
//! impl Component for Cam {
//!     fn name(&self) -> &str { "cam" }
//!     fn dependencies(&self) -> Vec<String> { Vec::new() }
//!     fn children(&self) -> Vec<ComponentRef> { Vec::new() }
//!     async fn terminate(&self) -> Result<(), TerminateError> { Ok(()) }
//! }
//!
//! struct Root;
//!
//! #[async_trait]
//! impl Component for Root {
//!     fn name(&self) -> &str { "rig" }
//!     fn dependencies(&self) -> Vec<String> { Vec::new() }
//!     fn children(&self) -> Vec<ComponentRef> { Vec::new() }
//!     async fn terminate(&self) -> Result<(), TerminateError> { Ok(()) }
//! }
//!
//! /// One camera, no dependencies; a real implementation would be driven by
//! /// the parsed hardware description.
//! struct Rig;
//!
//! #[async_trait]
//! impl Instantiator for Rig {
//!     fn declared(&self) -> HashSet<String> {
//!         ["cam".to_string()].into()
//!     }
//!     fn ready(&self, alive: &HashSet<String>) -> HashSet<String> {
//!         if alive.contains("cam") { HashSet::new() } else { ["cam".to_string()].into() }
//!     }
//!     async fn instantiate(&self, _name: &str) -> Result<ComponentRef, InstantiateError> {
//!         Ok(Arc::new(Cam))
//!     }
//!     fn children_of(&self, _component: &ComponentRef) -> Vec<ComponentRef> { Vec::new() }
//!     fn expected_children(&self, _name: &str) -> HashSet<String> { HashSet::new() }
//!     fn persistent_fields(&self, _name: &str) -> PersistentFields { PersistentFields::default() }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = Container::builder(Arc::new(Rig), Arc::new(Root) as ComponentRef)
//!         .with_settings_path("rig-settings.json")
//!         .build()?;
//!
//!     // Blocks until SIGINT/SIGTERM, an external terminate(), or a fatal
//!     // instantiation error; everything is down when it returns.
//!     container.run().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod graph;
mod persist;
mod policies;
mod subscribers;

#[cfg(test)]
mod testutil;

// ---- Public re-exports ----

pub use crate::core::{Container, ContainerBuilder, GhostStatus, RegistryView, StatusRegistry};
pub use config::Config;
pub use error::{InstantiateError, PersistError, RuntimeError, TerminateError};
pub use events::{Bus, Event, EventKind};
pub use graph::{
    Component, ComponentDecl, ComponentRef, GraphAdapter, GraphDescriptor, Instantiator,
    PersistentFields, SubContainer, SubContainerRef,
};
pub use persist::{ComponentSettings, SettingsDocument, SettingsTracker};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
