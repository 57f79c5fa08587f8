//! # Starter: the instantiation loop.
//!
//! A single background task that repeatedly asks the graph adapter which
//! not-yet-alive components have all dependencies satisfied, attempts to
//! instantiate each, updates the status registry, and backs off when nothing
//! is instantiable.
//!
//! ## Event flow
//! For each attempt, the loop publishes:
//! ```text
//! ComponentStarting → [instantiate] → ComponentStarted (success, also per child)
//!                                   → ComponentFailed (recoverable hardware error)
//!                                   → StarterDead (model error → container shutdown)
//!
//! If nothing is instantiable:
//!   → ScanBackoff → [sleep ≤ max] → (next scan, recently-failed cleared)
//! ```
//!
//! ## Rules
//! - A name is never instantiated twice concurrently: scans are sequential
//!   and a name in flight is `Starting` (hence not in the ready set).
//! - A recoverable failure quarantines the name until after the next sleep;
//!   unrelated components keep starting in the same scan.
//! - A model error (or a missing expected child) stops the loop permanently.
//! - Delegated children never appear in the ready set; they go alive with
//!   their creator.
//! - The stop token is observed at the top of every scan, between attempts,
//!   and inside the backoff sleep. An in-flight `instantiate` is awaited, not
//!   cancelled: hardware calls are never forcibly killed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::core::registry::StatusRegistry;
use crate::events::{Bus, Event, EventKind};
use crate::graph::GraphAdapter;
use crate::persist::SettingsTracker;
use crate::policies::BackoffPolicy;

/// Why the instantiation loop exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StarterExit {
    /// The stop token was observed.
    Stopped,
    /// A fatal (non-hardware) instantiation error; the container must shut
    /// down.
    Fatal(String),
}

/// The instantiation loop.
pub(crate) struct Starter {
    adapter: GraphAdapter,
    registry: Arc<StatusRegistry>,
    tracker: Arc<SettingsTracker>,
    bus: Bus,
    backoff: BackoffPolicy,
}

impl Starter {
    pub(crate) fn new(
        adapter: GraphAdapter,
        registry: Arc<StatusRegistry>,
        tracker: Arc<SettingsTracker>,
        bus: Bus,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            adapter,
            registry,
            tracker,
            bus,
            backoff,
        }
    }

    /// Runs scans until the token is cancelled or a fatal error occurs.
    ///
    /// Once the whole graph is alive the loop keeps polling at the backoff
    /// cap: hardware that failed earlier may have been plugged back in.
    pub(crate) async fn run(self, token: CancellationToken) -> StarterExit {
        let mut recently_failed: HashSet<String> = HashSet::new();
        let mut attempts: HashMap<String, u32> = HashMap::new();
        let mut idle_rounds: u32 = 0;

        loop {
            if token.is_cancelled() {
                self.bus.publish(Event::new(EventKind::StarterStopped));
                return StarterExit::Stopped;
            }

            let alive = self.registry.snapshot().alive_names();
            let ready = self.adapter.startable(&alive, &recently_failed);

            if ready.is_empty() {
                let delay = self.backoff.next(idle_rounds);
                idle_rounds = idle_rounds.saturating_add(1);
                self.bus
                    .publish(Event::new(EventKind::ScanBackoff).with_delay(delay));

                let sleep = time::sleep(delay);
                tokio::pin!(sleep);
                select! {
                    _ = &mut sleep => {}
                    _ = token.cancelled() => {
                        self.bus.publish(Event::new(EventKind::StarterStopped));
                        return StarterExit::Stopped;
                    }
                }
                // Quarantined hardware gets another chance next scan.
                recently_failed.clear();
                continue;
            }

            for name in ready {
                if token.is_cancelled() {
                    self.bus.publish(Event::new(EventKind::StarterStopped));
                    return StarterExit::Stopped;
                }
                match self
                    .instantiate_one(&name, &mut attempts, &mut recently_failed)
                    .await
                {
                    Ok(progress) => {
                        if progress {
                            idle_rounds = 0;
                        }
                    }
                    Err(reason) => {
                        self.bus.publish(
                            Event::new(EventKind::StarterDead)
                                .with_component(name)
                                .with_reason(reason.clone()),
                        );
                        return StarterExit::Fatal(reason);
                    }
                }
            }
        }
    }

    /// Attempts one component. `Ok(true)` on success, `Ok(false)` on a
    /// recoverable failure, `Err` on a fatal one.
    async fn instantiate_one(
        &self,
        name: &str,
        attempts: &mut HashMap<String, u32>,
        recently_failed: &mut HashSet<String>,
    ) -> Result<bool, String> {
        let attempt = attempts.entry(name.to_string()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        self.registry.mark_starting(name);
        self.bus.publish(
            Event::new(EventKind::ComponentStarting)
                .with_component(name)
                .with_attempt(attempt),
        );

        let component = match self.adapter.instantiate(name).await {
            Ok(component) => component,
            Err(e) if e.is_retryable() => {
                let reason = e.to_string();
                self.registry.mark_failed(name, &reason);
                recently_failed.insert(name.to_string());
                self.bus.publish(
                    Event::new(EventKind::ComponentFailed)
                        .with_component(name)
                        .with_attempt(attempt)
                        .with_reason(reason),
                );
                return Ok(false);
            }
            Err(e) => {
                let reason = e.to_string();
                self.registry.mark_failed(name, &reason);
                return Err(reason);
            }
        };

        let children = self.adapter.children_of(&component);
        let expected = self.adapter.expected_children(name);
        let actual: HashSet<String> = children.iter().map(|c| c.name().to_string()).collect();

        if let Some(missing) = expected.iter().find(|e| !actual.contains(*e)) {
            let reason = format!("component '{name}' came up without expected child '{missing}'");
            self.registry.mark_failed(name, &reason);
            return Err(reason);
        }
        for extra in actual.iter().filter(|a| !expected.contains(*a)) {
            self.bus.publish(
                Event::new(EventKind::UnexpectedChild)
                    .with_component(extra.as_str())
                    .with_reason(format!("created by '{name}' but not declared")),
            );
        }

        self.registry.mark_alive(Arc::clone(&component), &children);

        for c in std::iter::once(&component).chain(children.iter()) {
            let fields = self.adapter.persistent_fields(c.name());
            if !fields.is_empty() {
                self.tracker.track(Arc::clone(c), fields);
            }
            self.bus
                .publish(Event::new(EventKind::ComponentStarted).with_component(c.name()));
        }
        // Metadata has no change notification; re-read it whenever the rig
        // gains a component.
        self.tracker.refresh_metadata();

        Ok(true)
    }
}
