//! # Container: orchestrates the component graph's whole lifecycle.
//!
//! The [`Container`] owns the event bus, a [`SubscriberSet`], the status
//! registry, the settings tracker and the instantiation loop. It runs until
//! asked to stop, then drives the termination engine.
//!
//! ## High-level architecture
//! ```text
//! ContainerBuilder::new(instantiator, root)
//!     .with_settings_path(...)
//!     .with_subscribers(...)
//!     .build()?                                  (loads the settings document)
//!
//! Container::run():
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - spawn Starter::run(starter_token)   (the instantiation loop)
//!   - select:
//!       ├─ OS signal            ─► terminate() ─► Ok(())
//!       ├─ fatal starter exit   ─► terminate() ─► Err(FatalInstantiation)
//!       └─ external terminate() finished ──────► Ok(())
//!
//! Container::terminate():        (idempotent, synchronous)
//!   1. cancel starter_token, bounded join (stop_join; warn + proceed on timeout)
//!   2. SettingsTracker::flush_all()
//!   3. Terminator::terminate_all()  (waves → sub-containers → root)
//!   4. publish AllTerminated
//! ```
//!
//! ## Rules
//! - `terminate()` is callable from anywhere, any number of times; only the
//!   first call does work, later calls wait for it to finish and return.
//! - A fatal instantiation error triggers exactly one full shutdown.
//! - The registry snapshot from [`Container::status`] is the single source
//!   of truth for any status observer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::registry::{RegistryView, StatusRegistry};
use crate::core::shutdown;
use crate::core::starter::{Starter, StarterExit};
use crate::core::terminator::Terminator;
use crate::error::{PersistError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::graph::{ComponentRef, GraphAdapter, Instantiator};
use crate::persist::{SettingsDocument, SettingsTracker};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Container`].
pub struct ContainerBuilder {
    cfg: Config,
    instantiator: Arc<dyn Instantiator>,
    root: ComponentRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
    settings_path: Option<PathBuf>,
}

impl ContainerBuilder {
    /// Creates a builder around the external instantiator and the already
    /// existing root component.
    pub fn new(instantiator: Arc<dyn Instantiator>, root: ComponentRef) -> Self {
        Self {
            cfg: Config::default(),
            instantiator,
            root,
            subscribers: Vec::new(),
            settings_path: None,
        }
    }

    /// Overrides the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (component lifecycle, termination
    /// progress, settings faults) through dedicated workers with bounded
    /// queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the path of the persistent settings document.
    ///
    /// Without a path the tracker keeps settings in memory only.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Builds the container, loading the settings document if a path was
    /// configured.
    pub fn build(self) -> Result<Arc<Container>, PersistError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let runtime_token = CancellationToken::new();
        let tracker =
            SettingsTracker::load(self.settings_path, bus.clone(), runtime_token.child_token())?;
        let adapter = GraphAdapter::new(self.instantiator);
        let registry = Arc::new(StatusRegistry::new(adapter.declared()));

        Ok(Arc::new(Container {
            starter_token: runtime_token.child_token(),
            cfg: self.cfg,
            bus,
            subs,
            adapter,
            registry,
            tracker,
            root: self.root,
            runtime_token,
            fatal_token: CancellationToken::new(),
            fatal_reason: Arc::new(Mutex::new(None)),
            starter_join: Mutex::new(None),
            started: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
            down_token: CancellationToken::new(),
        }))
    }
}

/// Coordinates startup, persistence, event delivery and shutdown for one
/// component graph.
pub struct Container {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    adapter: GraphAdapter,
    registry: Arc<StatusRegistry>,
    tracker: Arc<SettingsTracker>,
    root: ComponentRef,

    /// Parent token: settings watchers hang off it; cancelled once the graph
    /// is fully down.
    runtime_token: CancellationToken,
    /// Stops the instantiation loop (child of `runtime_token`).
    starter_token: CancellationToken,
    /// Cancelled by the starter wrapper on a fatal instantiation error.
    fatal_token: CancellationToken,
    fatal_reason: Arc<Mutex<Option<String>>>,
    starter_join: Mutex<Option<JoinHandle<StarterExit>>>,

    started: AtomicBool,
    terminating: AtomicBool,
    /// Cancelled once termination has fully completed.
    down_token: CancellationToken,
}

impl Container {
    /// Shorthand for [`ContainerBuilder::new`].
    pub fn builder(instantiator: Arc<dyn Instantiator>, root: ComponentRef) -> ContainerBuilder {
        ContainerBuilder::new(instantiator, root)
    }

    /// Runs the container until a termination signal, an external
    /// [`terminate`](Container::terminate), or a fatal instantiation error.
    ///
    /// On the fatal path the container shuts itself down completely before
    /// returning [`RuntimeError::FatalInstantiation`].
    pub async fn run(&self) -> Result<(), RuntimeError> {
        if !self.started.swap(true, Ordering::SeqCst) {
            self.spawn_subscriber_listener();
            self.spawn_starter();
        }

        tokio::select! {
            _ = shutdown::wait_for_shutdown_signal() => {
                self.terminate().await;
                Ok(())
            }
            _ = self.fatal_token.cancelled() => {
                let reason = self
                    .fatal_reason
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
                    .unwrap_or_else(|| "instantiation failed".to_string());
                self.terminate().await;
                Err(RuntimeError::FatalInstantiation { reason })
            }
            _ = self.down_token.cancelled() => Ok(()),
        }
    }

    /// Shuts everything down: the instantiation loop, the settings flush,
    /// then every alive component in reverse-dependency order.
    ///
    /// Idempotent: only the first call does work; concurrent or later calls
    /// block until that work is finished and return.
    pub async fn terminate(&self) {
        if self.terminating.swap(true, Ordering::SeqCst) {
            self.down_token.cancelled().await;
            return;
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        // 1. Stop the instantiation loop; a loop stuck in a hardware call is
        //    abandoned, never force-killed.
        self.starter_token.cancel();
        let handle = self
            .starter_join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if time::timeout(self.cfg.stop_join, handle).await.is_err() {
                self.bus.publish(Event::new(EventKind::StarterStuck).with_reason(format!(
                    "did not stop within {:?}; proceeding",
                    self.cfg.stop_join
                )));
            }
        }

        // 2. Settings must be durable before anything goes down.
        self.tracker.flush_all();

        // 3.-5. Reverse-dependency waves, leftover sub-containers, root.
        let terminator = Terminator::new(
            self.adapter.clone(),
            Arc::clone(&self.registry),
            self.bus.clone(),
            Arc::clone(&self.root),
            self.cfg.terminate_pool_limit(),
        );
        terminator.terminate_all().await;

        self.bus.publish(Event::new(EventKind::AllTerminated));
        self.runtime_token.cancel();
        self.down_token.cancel();
    }

    /// Read-only live view of `{alive, ghosts}` for observers (status UIs,
    /// the RPC layer).
    pub fn status(&self) -> Arc<RegistryView> {
        self.registry.snapshot()
    }

    /// The event bus; subscribe for a raw stream of runtime events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// A copy of the current in-memory settings document.
    pub fn settings(&self) -> SettingsDocument {
        self.tracker.document()
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
    }

    /// Spawns the instantiation loop; a fatal exit trips `fatal_token`.
    fn spawn_starter(&self) {
        let starter = Starter::new(
            self.adapter.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.tracker),
            self.bus.clone(),
            self.cfg.scan_backoff,
        );
        let token = self.starter_token.clone();
        let fatal_token = self.fatal_token.clone();
        let fatal_reason = Arc::clone(&self.fatal_reason);

        let handle = tokio::spawn(async move {
            let exit = starter.run(token).await;
            if let StarterExit::Fatal(reason) = &exit {
                *fatal_reason.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(reason.clone());
                fatal_token.cancel();
            }
            exit
        });
        *self
            .starter_join
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}
