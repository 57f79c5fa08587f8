//! # Terminator: reverse-dependency shutdown waves.
//!
//! Computes the reverse-dependency graph over the currently alive components
//! and terminates them in parallel waves through a bounded worker pool,
//! always terminating a component's dependents (and its delegated children)
//! before the component itself.
//!
//! ## Architecture
//! ```text
//! alive snapshot
//!   │  reverse map: dependents[x] = {components that must die before x}
//!   │  (power supplier counts as a dependency of everything it powers;
//!   │   delegated children are not scheduled — they die with their creator)
//!   ▼
//! loop: independents = {x | dependents[x] == ∅}
//!   ├─► none left but components remain → TerminationStalled, force one
//!   ├─► submit each independent to the pool (Semaphore width from Config):
//!   │       worker: children depth-first → component → name
//!   └─► await ONE completion → shrink dependent sets → recompute
//!           (the pool is kept as full as possible; no wave barriers)
//! ```
//!
//! ## Rules
//! - A worker terminates the component's own children first, depth-first.
//! - Any failure (error or panic) while terminating is published and treated
//!   as "terminated" for graph progress; shutdown never blocks on it.
//! - After the alive set is empty: leftover per-component sub-containers are
//!   torn down (covers partially-instantiated components), then the root.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::registry::StatusRegistry;
use crate::events::{Bus, Event, EventKind};
use crate::graph::{ComponentRef, GraphAdapter};

/// The termination engine. Driven once per container lifetime.
pub(crate) struct Terminator {
    adapter: GraphAdapter,
    registry: Arc<StatusRegistry>,
    bus: Bus,
    root: ComponentRef,
    pool_limit: Option<usize>,
}

impl Terminator {
    pub(crate) fn new(
        adapter: GraphAdapter,
        registry: Arc<StatusRegistry>,
        bus: Bus,
        root: ComponentRef,
        pool_limit: Option<usize>,
    ) -> Self {
        Self {
            adapter,
            registry,
            bus,
            root,
            pool_limit,
        }
    }

    /// Terminates every alive component in reverse-dependency order, then
    /// leftover sub-containers, then the root. Blocks until everything is
    /// down.
    pub(crate) async fn terminate_all(&self) {
        let declared = self.adapter.declared();
        let alive = self.registry.snapshot().alive.clone();

        // Delegated children terminate as part of their creator, never as
        // independently scheduled nodes.
        let mut delegated: HashSet<String> = HashSet::new();
        for component in alive.values() {
            collect_child_names(component, &mut delegated);
        }

        let mut dependents: HashMap<String, HashSet<String>> = alive
            .keys()
            .filter(|name| !delegated.contains(*name))
            .map(|name| (name.clone(), HashSet::new()))
            .collect();
        for (name, component) in &alive {
            if delegated.contains(name) {
                continue;
            }
            for dep in component.dependencies() {
                if let Some(set) = dependents.get_mut(&dep) {
                    set.insert(name.clone());
                }
            }
            // Never cut power under a component that is still going down.
            if let Some(psu) = component.power_supplier() {
                if psu != *name {
                    if let Some(set) = dependents.get_mut(&psu) {
                        set.insert(name.clone());
                    }
                }
            }
        }

        let semaphore = self.pool_limit.map(|n| Arc::new(Semaphore::new(n)));
        let mut pool: JoinSet<String> = JoinSet::new();
        let mut dying: HashSet<String> = HashSet::new();

        while !dependents.is_empty() {
            let mut independents: Vec<String> = dependents
                .iter()
                .filter(|(name, blockers)| !dying.contains(*name) && blockers.is_empty())
                .map(|(name, _)| name.clone())
                .collect();
            independents.sort_unstable();

            if independents.is_empty() && pool.is_empty() {
                // Every remaining component still has a live dependent: a
                // cycle, or a dependent stuck from partially-failed
                // instantiation. Force the smallest name to keep moving.
                let Some(forced) = dependents.keys().min().cloned() else {
                    break;
                };
                self.bus.publish(
                    Event::new(EventKind::TerminationStalled)
                        .with_component(forced.as_str())
                        .with_reason("every remaining component has a live dependent"),
                );
                independents.push(forced);
            }

            for name in independents {
                dying.insert(name.clone());
                let component = alive.get(&name).cloned();
                let semaphore = semaphore.clone();
                let bus = self.bus.clone();
                pool.spawn(async move {
                    let _permit = match &semaphore {
                        Some(s) => s.clone().acquire_owned().await.ok(),
                        None => None,
                    };
                    if let Some(component) = component {
                        terminate_tree(component, bus).await;
                    }
                    name
                });
            }

            // One completion is enough to recompute; keep the pool full.
            if let Some(finished) = pool.join_next().await {
                match finished {
                    Ok(name) => {
                        self.finish(&name, &alive, &declared, &mut dependents, &mut dying)
                    }
                    Err(e) => {
                        // Worker-level fault; per-component panics are already
                        // caught inside terminate_tree.
                        self.bus.publish(
                            Event::new(EventKind::TerminateFailed)
                                .with_reason(format!("termination worker: {e}")),
                        );
                    }
                }
            }
        }

        while let Some(finished) = pool.join_next().await {
            if let Ok(name) = finished {
                self.finish(&name, &alive, &declared, &mut dependents, &mut dying);
            }
        }

        self.terminate_sub_containers(&declared).await;
        terminate_tree(Arc::clone(&self.root), self.bus.clone()).await;
    }

    /// Books one finished component: shrink the reverse map and move the
    /// component (with its delegated children) out of `alive`.
    fn finish(
        &self,
        name: &str,
        alive: &HashMap<String, ComponentRef>,
        declared: &HashSet<String>,
        dependents: &mut HashMap<String, HashSet<String>>,
        dying: &mut HashSet<String>,
    ) {
        dependents.remove(name);
        for blockers in dependents.values_mut() {
            blockers.remove(name);
        }
        dying.remove(name);

        let mut done = HashSet::new();
        done.insert(name.to_string());
        if let Some(component) = alive.get(name) {
            collect_child_names(component, &mut done);
        }
        let done: Vec<String> = done.into_iter().collect();
        self.registry.mark_terminated(&done, declared);
    }

    /// Tears down isolation containers that still exist, including those of
    /// components that never finished instantiating.
    async fn terminate_sub_containers(&self, declared: &HashSet<String>) {
        let mut names: Vec<&String> = declared.iter().collect();
        names.sort_unstable();
        for name in names {
            let Some(sub) = self.adapter.sub_container(name) else {
                continue;
            };
            let attempt = std::panic::AssertUnwindSafe(sub.terminate()).catch_unwind();
            match attempt.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.bus.publish(
                    Event::new(EventKind::TerminateFailed)
                        .with_component(name.as_str())
                        .with_reason(format!("sub-container: {e}")),
                ),
                Err(panic) => self.bus.publish(
                    Event::new(EventKind::TerminateFailed)
                        .with_component(name.as_str())
                        .with_reason(format!("sub-container panicked: {}", panic_message(&panic))),
                ),
            }
        }
    }
}

/// Collects all transitive delegated-child names of `component`.
fn collect_child_names(component: &ComponentRef, out: &mut HashSet<String>) {
    for child in component.children() {
        if out.insert(child.name().to_string()) {
            collect_child_names(&child, out);
        }
    }
}

/// Terminates `component`'s children depth-first, then the component itself.
///
/// Every error or panic is published and swallowed: a stubborn device never
/// blocks the shutdown of the rest of the rig.
async fn terminate_tree(component: ComponentRef, bus: Bus) {
    for child in component.children() {
        Box::pin(terminate_tree(child, bus.clone())).await;
    }

    let name = component.name().to_string();
    let attempt = std::panic::AssertUnwindSafe(component.terminate()).catch_unwind();
    match attempt.await {
        Ok(Ok(())) => {
            bus.publish(Event::new(EventKind::ComponentTerminated).with_component(name));
        }
        Ok(Err(e)) => {
            bus.publish(
                Event::new(EventKind::TerminateFailed)
                    .with_component(name)
                    .with_reason(e.to_string()),
            );
        }
        Err(panic) => {
            bus.publish(
                Event::new(EventKind::TerminateFailed)
                    .with_component(name)
                    .with_reason(format!("panicked: {}", panic_message(&panic))),
            );
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
