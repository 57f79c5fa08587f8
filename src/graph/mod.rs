//! Component graph: trait seams and declarations.
//!
//! ## Contents
//! - [`Component`], [`SubContainer`] the runtime's view of running units
//! - [`ComponentDecl`], [`GraphDescriptor`] the parsed read-only declarations
//! - [`Instantiator`] the external collaborator seam
//! - [`GraphAdapter`] the thin wrapper the runtime calls
//!
//! The graph flows one way: the external parser produces a
//! [`GraphDescriptor`]; an [`Instantiator`] implementation turns names into
//! running [`Component`]s; the core only ever works with names and trait
//! objects.

mod component;
mod descriptor;
mod instantiator;

pub use component::{Component, ComponentRef, SubContainer, SubContainerRef};
pub use descriptor::{ComponentDecl, GraphDescriptor};
pub use instantiator::{GraphAdapter, Instantiator, PersistentFields};
