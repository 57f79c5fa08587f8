//! In-memory fake rig for tests: a scriptable [`Instantiator`] plus
//! hand-buildable components.
//!
//! `FakeRig` answers readiness from a real [`GraphDescriptor`], builds
//! `FakeComponent`s (with delegated children) on demand, and can be scripted
//! to fail: hardware errors for the first N attempts, permanent model errors,
//! suppressed or extra children, failing terminations. Every component
//! termination appends `begin <name>` / `end <name>` to a shared log so tests
//! can assert ordering.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{InstantiateError, TerminateError};
use crate::graph::{
    Component, ComponentDecl, ComponentRef, GraphDescriptor, Instantiator, PersistentFields,
    SubContainer, SubContainerRef,
};

pub(crate) type TermLog = Arc<Mutex<Vec<String>>>;

// ---------------------------------------------------------------------------
// FakeComponent
// ---------------------------------------------------------------------------

pub(crate) struct FakeComponent {
    name: String,
    dependencies: Vec<String>,
    power: Option<String>,
    children: Vec<ComponentRef>,
    props: Mutex<HashMap<String, watch::Sender<Value>>>,
    metadata: Mutex<HashMap<String, Value>>,
    term_log: TermLog,
    fail_terminate: bool,
}

impl FakeComponent {
    pub(crate) fn build(name: &str) -> FakeComponentBuilder {
        FakeComponentBuilder {
            name: name.to_string(),
            dependencies: Vec::new(),
            power: None,
            children: Vec::new(),
            props: HashMap::new(),
            metadata: HashMap::new(),
            term_log: Arc::new(Mutex::new(Vec::new())),
            fail_terminate: false,
        }
    }

    /// Driver-side property update: notifies any tracker watcher.
    pub(crate) fn set_property(&self, name: &str, value: Value) {
        let mut props = self.props.lock().unwrap();
        match props.get(name) {
            Some(tx) => {
                tx.send_replace(value);
            }
            None => {
                let (tx, _rx) = watch::channel(value);
                props.insert(name.to_string(), tx);
            }
        }
    }

    /// Driver-side metadata update (no notification, by design).
    pub(crate) fn set_metadata(&self, name: &str, value: Value) {
        self.metadata
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }
}

#[async_trait]
impl Component for FakeComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn children(&self) -> Vec<ComponentRef> {
        self.children.clone()
    }

    fn power_supplier(&self) -> Option<String> {
        self.power.clone()
    }

    async fn terminate(&self) -> Result<(), TerminateError> {
        self.term_log
            .lock()
            .unwrap()
            .push(format!("begin {}", self.name));
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.term_log
            .lock()
            .unwrap()
            .push(format!("end {}", self.name));
        if self.fail_terminate {
            return Err(TerminateError::new("simulated termination failure"));
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.props
            .lock()
            .unwrap()
            .get(name)
            .map(|tx| tx.borrow().clone())
    }

    fn watch_property(&self, name: &str) -> Option<watch::Receiver<Value>> {
        self.props
            .lock()
            .unwrap()
            .get(name)
            .map(|tx| tx.subscribe())
    }

    fn metadata(&self, name: &str) -> Option<Value> {
        self.metadata.lock().unwrap().get(name).cloned()
    }
}

pub(crate) struct FakeComponentBuilder {
    name: String,
    dependencies: Vec<String>,
    power: Option<String>,
    children: Vec<ComponentRef>,
    props: HashMap<String, watch::Sender<Value>>,
    metadata: HashMap<String, Value>,
    term_log: TermLog,
    fail_terminate: bool,
}

impl FakeComponentBuilder {
    pub(crate) fn with_property(mut self, name: &str, value: Value) -> Self {
        let (tx, _rx) = watch::channel(value);
        self.props.insert(name.to_string(), tx);
        self
    }

    pub(crate) fn with_metadata(mut self, name: &str, value: Value) -> Self {
        self.metadata.insert(name.to_string(), value);
        self
    }

    pub(crate) fn with_child(mut self, child: ComponentRef) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn with_dependency(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub(crate) fn with_power(mut self, name: &str) -> Self {
        self.power = Some(name.to_string());
        self
    }

    pub(crate) fn with_term_log(mut self, log: TermLog) -> Self {
        self.term_log = log;
        self
    }

    pub(crate) fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    pub(crate) fn into_fake(self) -> Arc<FakeComponent> {
        Arc::new(FakeComponent {
            name: self.name,
            dependencies: self.dependencies,
            power: self.power,
            children: self.children,
            props: Mutex::new(self.props),
            metadata: Mutex::new(self.metadata),
            term_log: self.term_log,
            fail_terminate: self.fail_terminate,
        })
    }

    pub(crate) fn into_ref(self) -> ComponentRef {
        self.into_fake()
    }
}

// ---------------------------------------------------------------------------
// FakeRig
// ---------------------------------------------------------------------------

struct FakeSubContainer {
    name: String,
    term_log: TermLog,
}

#[async_trait]
impl SubContainer for FakeSubContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn terminate(&self) -> Result<(), TerminateError> {
        self.term_log
            .lock()
            .unwrap()
            .push(format!("end sub:{}", self.name));
        Ok(())
    }
}

/// Scriptable in-memory instantiator.
pub(crate) struct FakeRig {
    descriptor: GraphDescriptor,
    properties: HashMap<String, Vec<(String, Value)>>,
    extra_children: HashMap<String, Vec<String>>,
    suppressed_children: HashSet<String>,
    model_failures: HashSet<String>,
    failing_terminations: HashSet<String>,
    sub_containers: HashSet<String>,
    hardware_failures: Mutex<HashMap<String, u32>>,
    instantiate_counts: Mutex<HashMap<String, u32>>,
    built: Mutex<HashMap<String, Arc<FakeComponent>>>,
    term_log: TermLog,
    root: Arc<FakeComponent>,
}

impl FakeRig {
    pub(crate) fn new() -> FakeRigBuilder {
        FakeRigBuilder {
            decls: BTreeMap::new(),
            properties: HashMap::new(),
            extra_children: HashMap::new(),
            suppressed_children: HashSet::new(),
            model_failures: HashSet::new(),
            hardware_failures: HashMap::new(),
            failing_terminations: HashSet::new(),
            sub_containers: HashSet::new(),
        }
    }

    pub(crate) fn root(&self) -> ComponentRef {
        Arc::clone(&self.root) as ComponentRef
    }

    pub(crate) fn log_handle(&self) -> TermLog {
        Arc::clone(&self.term_log)
    }

    pub(crate) fn term_log(&self) -> Vec<String> {
        self.term_log.lock().unwrap().clone()
    }

    pub(crate) fn instantiate_count(&self, name: &str) -> u32 {
        self.instantiate_counts
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// The built component, for driver-side updates in tests.
    pub(crate) fn component(&self, name: &str) -> Arc<FakeComponent> {
        self.built
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("component '{name}' was never instantiated"))
    }

    fn build_component(&self, name: &str) -> Arc<FakeComponent> {
        let decl = self.descriptor.decl(name).cloned().unwrap_or_default();
        let mut builder = FakeComponent::build(name).with_term_log(self.log_handle());

        for dep in &decl.dependencies {
            builder = builder.with_dependency(dep);
        }
        if let Some(psu) = &decl.power_supplier {
            builder = builder.with_power(psu);
        }
        if self.failing_terminations.contains(name) {
            builder = builder.failing_terminate();
        }
        if let Some(props) = self.properties.get(name) {
            for (prop, value) in props {
                builder = builder.with_property(prop, value.clone());
            }
        }

        if !self.suppressed_children.contains(name) {
            for child in &decl.children {
                builder = builder.with_child(self.build_component(child));
            }
        }
        if let Some(extras) = self.extra_children.get(name) {
            for extra in extras {
                builder = builder.with_child(self.build_component(extra));
            }
        }

        let component = builder.into_fake();
        self.built
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&component));
        component
    }
}

#[async_trait]
impl Instantiator for FakeRig {
    fn declared(&self) -> HashSet<String> {
        self.descriptor.declared()
    }

    fn ready(&self, alive: &HashSet<String>) -> HashSet<String> {
        self.descriptor.startable(alive)
    }

    async fn instantiate(&self, name: &str) -> Result<ComponentRef, InstantiateError> {
        *self
            .instantiate_counts
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;

        if self.model_failures.contains(name) {
            return Err(InstantiateError::model(format!(
                "driver for '{name}' rejected its configuration"
            )));
        }
        {
            let mut failures = self.hardware_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(name) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(InstantiateError::hardware(format!(
                        "'{name}' is not answering"
                    )));
                }
            }
        }

        Ok(self.build_component(name))
    }

    fn children_of(&self, component: &ComponentRef) -> Vec<ComponentRef> {
        fn walk(component: &ComponentRef, out: &mut Vec<ComponentRef>) {
            for child in component.children() {
                out.push(Arc::clone(&child));
                walk(&child, out);
            }
        }
        let mut out = Vec::new();
        walk(component, &mut out);
        out
    }

    fn expected_children(&self, name: &str) -> HashSet<String> {
        self.descriptor.expected_children(name)
    }

    fn persistent_fields(&self, name: &str) -> PersistentFields {
        match self.descriptor.decl(name) {
            Some(decl) => PersistentFields {
                properties: decl.persistent_properties.clone(),
                metadata: decl.persistent_metadata.clone(),
            },
            None => PersistentFields::default(),
        }
    }

    fn sub_container(&self, name: &str) -> Option<SubContainerRef> {
        if !self.sub_containers.contains(name) {
            return None;
        }
        Some(Arc::new(FakeSubContainer {
            name: name.to_string(),
            term_log: self.log_handle(),
        }))
    }
}

pub(crate) struct FakeRigBuilder {
    decls: BTreeMap<String, ComponentDecl>,
    properties: HashMap<String, Vec<(String, Value)>>,
    extra_children: HashMap<String, Vec<String>>,
    suppressed_children: HashSet<String>,
    model_failures: HashSet<String>,
    hardware_failures: HashMap<String, u32>,
    failing_terminations: HashSet<String>,
    sub_containers: HashSet<String>,
}

impl FakeRigBuilder {
    /// Declares an independently instantiable component.
    pub(crate) fn declare(mut self, name: &str, deps: &[&str]) -> Self {
        self.decls.insert(
            name.to_string(),
            ComponentDecl {
                dependencies: deps.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    /// Declares a delegated child of `creator`.
    pub(crate) fn declare_child(mut self, child: &str, creator: &str) -> Self {
        self.decls.insert(
            child.to_string(),
            ComponentDecl {
                creator: Some(creator.to_string()),
                ..Default::default()
            },
        );
        self.decls
            .entry(creator.to_string())
            .or_default()
            .children
            .push(child.to_string());
        self
    }

    /// Declares that `psu` controls `component`'s power.
    pub(crate) fn power(mut self, component: &str, psu: &str) -> Self {
        self.decls
            .entry(component.to_string())
            .or_default()
            .power_supplier = Some(psu.to_string());
        self
    }

    /// Designates persistent fields for `name`.
    pub(crate) fn persistent(mut self, name: &str, props: &[&str], metas: &[&str]) -> Self {
        let decl = self.decls.entry(name.to_string()).or_default();
        decl.persistent_properties = props.iter().map(|s| s.to_string()).collect();
        decl.persistent_metadata = metas.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Gives `name` an initial property value when built.
    pub(crate) fn property(mut self, name: &str, prop: &str, value: Value) -> Self {
        self.properties
            .entry(name.to_string())
            .or_default()
            .push((prop.to_string(), value));
        self
    }

    /// The first `n` instantiation attempts for `name` fail with a hardware
    /// error.
    pub(crate) fn fail_hardware(mut self, name: &str, n: u32) -> Self {
        self.hardware_failures.insert(name.to_string(), n);
        self
    }

    /// Every instantiation attempt for `name` fails with a model error.
    pub(crate) fn fail_model(mut self, name: &str) -> Self {
        self.model_failures.insert(name.to_string());
        self
    }

    /// `name` terminates with an error.
    pub(crate) fn fail_terminate(mut self, name: &str) -> Self {
        self.failing_terminations.insert(name.to_string());
        self
    }

    /// `name` comes up without its declared children.
    pub(crate) fn suppress_children(mut self, name: &str) -> Self {
        self.suppressed_children.insert(name.to_string());
        self
    }

    /// `creator` comes up with an undeclared extra child.
    pub(crate) fn extra_child(mut self, creator: &str, child: &str) -> Self {
        self.extra_children
            .entry(creator.to_string())
            .or_default()
            .push(child.to_string());
        self
    }

    /// `name` runs in an isolation container that must be torn down with it.
    pub(crate) fn sub_container(mut self, name: &str) -> Self {
        self.sub_containers.insert(name.to_string());
        self
    }

    pub(crate) fn build(self) -> Arc<FakeRig> {
        let term_log: TermLog = Arc::new(Mutex::new(Vec::new()));
        let root = FakeComponent::build("rig-root")
            .with_term_log(Arc::clone(&term_log))
            .into_fake();
        Arc::new(FakeRig {
            descriptor: GraphDescriptor::new(self.decls),
            properties: self.properties,
            extra_children: self.extra_children,
            suppressed_children: self.suppressed_children,
            model_failures: self.model_failures,
            failing_terminations: self.failing_terminations,
            sub_containers: self.sub_containers,
            hardware_failures: Mutex::new(self.hardware_failures),
            instantiate_counts: Mutex::new(HashMap::new()),
            built: Mutex::new(HashMap::new()),
            term_log,
            root,
        })
    }
}
