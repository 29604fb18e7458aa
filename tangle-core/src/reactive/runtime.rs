//! Reactive Runtime
//!
//! The [`Graph`] is the central coordinator. It owns the registry and drives
//! every read, evaluation and propagation.
//!
//! # How It Works
//!
//! 1. Definitions are installed, then the out-graph is reified and event
//!    sources are wired up.
//!
//! 2. A read of a node yields its value, forcing a first evaluation for
//!    synthetics and a one-time load for libraries.
//!
//! 3. A commit (data write, event firing, synthetic result) walks the
//!    node's out-list and triggers each dependent whose event inputs have
//!    all fired.
//!
//! # Suspension
//!
//! Reads and evaluations are futures. Propagation polls each triggered
//! evaluation once, in place, so purely synchronous chains finish before
//! the committing call returns. Work that suspends on an asynchronous
//! dependency is handed to the graph's driver and resumes there, one
//! evaluation at a time (see `driver`). No registry lock is held across a
//! user callback or an await.

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use tokio::runtime::Handle as RuntimeHandle;

use super::data::DataAccessor;
use super::driver::Driver;
use super::inputs::{Input, Inputs};
use super::library::LibraryLoader;
use crate::config::GraphConfig;
use crate::defs;
use crate::definition::{DefineOptions, Definition, Definitions};
use crate::error::{GraphError, Result};
use crate::graph::{install, Batch, Body, Lifecycle, NodeInfo, NodeKind, Registry, Scope};

/// Shared state behind every [`Graph`] handle.
pub(crate) struct GraphInner {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) loader: RwLock<Option<Arc<dyn LibraryLoader>>>,
    pub(crate) runtime: RwLock<Option<RuntimeHandle>>,
    pub(crate) driver: Mutex<Driver>,
    /// Held while any evaluation is polled or any commit propagates.
    pub(crate) turn: ReentrantMutex<()>,
    config: GraphConfig,
}

/// A reactive dataflow graph.
///
/// Cloning a `Graph` yields another handle to the same graph. Dropping the
/// last handle tears the graph down; event setters and data accessors held
/// elsewhere become inert.
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Arc<GraphInner>,
}

impl Graph {
    /// Create a graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let graph = Self {
            inner: Arc::new(GraphInner {
                registry: RwLock::new(Registry::new()),
                loader: RwLock::new(None),
                runtime: RwLock::new(RuntimeHandle::try_current().ok()),
                driver: Mutex::new(Driver::default()),
                turn: ReentrantMutex::new(()),
                config,
            }),
        };

        if graph.inner.config.init_event {
            let builtins = vec![("init".to_string(), defs::init_event())];
            let mut registry = graph.inner.registry.write();
            if let Err(err) = install(&mut registry, builtins, &Batch::default(), &graph.inner.config) {
                tracing::error!(%err, "failed to install the init event");
            }
        }

        graph
    }

    pub(crate) fn from_inner(inner: Arc<GraphInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<GraphInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    /// Install the loader used by library nodes.
    pub fn set_loader(&self, loader: impl LibraryLoader + 'static) {
        *self.inner.loader.write() = Some(Arc::new(loader));
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Install a batch of definitions, then reify and wire up.
    pub fn define<I, K>(&self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Definition)>,
        K: Into<String>,
    {
        self.define_with(definitions, DefineOptions::default())
    }

    pub fn define_with<I, K>(&self, definitions: I, options: DefineOptions) -> Result<()>
    where
        I: IntoIterator<Item = (K, Definition)>,
        K: Into<String>,
    {
        let definitions: Definitions = definitions
            .into_iter()
            .map(|(name, definition)| (name.into(), definition))
            .collect();

        {
            let mut registry = self.inner.registry.write();
            install(
                &mut registry,
                definitions,
                &Batch::top(options.scope.clone()),
                &self.inner.config,
            )?;
            if options.reify {
                let edges = registry.reify()?;
                tracing::debug!(nodes = registry.len(), edges, "graph reified");
            }
        }

        if options.wireup {
            self.wireup();
        }
        Ok(())
    }

    /// Rebuild every out-list from the current bindings.
    pub fn reify(&self) -> Result<()> {
        let mut registry = self.inner.registry.write();
        let edges = registry.reify()?;
        tracing::debug!(nodes = registry.len(), edges, "graph reified");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Resolve `name` as seen from `scope`.
    pub fn resolve(&self, name: &str, scope: &Scope) -> Option<String> {
        self.inner.registry.read().resolve(name, scope)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.read().get(name).is_some()
    }

    pub fn kind(&self, name: &str) -> Result<NodeKind> {
        Ok(self.inner.registry.read().node(name)?.kind())
    }

    /// Qualified names of the nodes a change to `name` triggers.
    pub fn dependents(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.inner.registry.read().node(name)?.out.clone())
    }

    pub fn lifecycle(&self, name: &str) -> Result<Lifecycle> {
        Ok(self.inner.registry.read().node(name)?.lifecycle())
    }

    /// Nodes with an evaluation or a load still in flight.
    ///
    /// A node that stays here indefinitely is stalled on an asynchronous
    /// dependency that never completed.
    pub fn pending(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .nodes()
            .filter(|node| {
                matches!(node.lifecycle(), Lifecycle::Evaluating | Lifecycle::Loading)
            })
            .map(|node| node.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable view of every node, in installation order.
    pub fn snapshot(&self) -> Vec<NodeInfo> {
        self.inner.registry.read().nodes().map(|node| node.info()).collect()
    }

    // ------------------------------------------------------------------------
    // Reads and evaluation
    // ------------------------------------------------------------------------

    /// Read a node.
    ///
    /// Data yields an accessor, libraries yield their handle, every other
    /// kind yields its value. The future may complete immediately or only
    /// once an asynchronous dependency resolves.
    pub fn read(&self, name: &str) -> BoxFuture<'static, Result<Input>> {
        self.serialized(self.yield_input(name.to_string(), None))
    }

    /// Read a node's value.
    pub async fn value(&self, name: &str) -> Result<Value> {
        let input = self.read(name).await?;
        match input.value() {
            Some(value) => Ok(value),
            None => Err(GraphError::NoValue(name.to_string())),
        }
    }

    /// Force a node's computation, regardless of gating.
    pub fn evaluate(&self, name: &str) -> BoxFuture<'static, Result<()>> {
        self.serialized(self.evaluate_for(name.to_string(), None))
    }

    pub(crate) fn yield_input(
        &self,
        name: String,
        requester: Option<String>,
    ) -> BoxFuture<'static, Result<Input>> {
        enum Read {
            Data,
            Value(Value),
            Force,
            Library,
        }

        let graph = self.clone();
        async move {
            let read = {
                let registry = graph.inner.registry.read();
                let node = registry.node(&name)?;
                match &node.body {
                    Body::Data { .. } => Read::Data,
                    Body::Synthetic { .. } if !node.invoked => Read::Force,
                    Body::Synthetic { .. } | Body::Event { .. } => Read::Value(node.value.clone()),
                    Body::Effect { .. } => Read::Value(Value::Null),
                    Body::Library { .. } => Read::Library,
                }
            };

            match read {
                Read::Data => Ok(Input::Data(DataAccessor::new(&graph, name))),
                Read::Value(value) => Ok(Input::Value(value)),
                Read::Force => {
                    graph.evaluate_for(name.clone(), requester).await?;
                    let value = graph.inner.registry.read().node(&name)?.value.clone();
                    Ok(Input::Value(value))
                }
                Read::Library => Ok(Input::Library(graph.load_library(name).await?)),
            }
        }
        .boxed()
    }

    /// Evaluate `name`. A synthetic result does not re-trigger `requester`,
    /// the reader that forced this evaluation.
    pub(crate) fn evaluate_for(
        &self,
        name: String,
        requester: Option<String>,
    ) -> BoxFuture<'static, Result<()>> {
        let kind = match self.kind(&name) {
            Ok(kind) => kind,
            Err(err) => return futures_util::future::ready(Err(err)).boxed(),
        };
        match kind {
            NodeKind::Synthetic => self.evaluate_synthetic(name, requester),
            NodeKind::Effect => self.run_effect(name),
            NodeKind::Library => {
                let load = self.load_library(name);
                async move { load.await.map(|_| ()) }.boxed()
            }
            NodeKind::Data | NodeKind::Event => futures_util::future::ready(Ok(())).boxed(),
        }
    }

    /// Read every declared dependency of `name`, strictly in order.
    pub(crate) fn gather(&self, name: String) -> BoxFuture<'static, Result<Inputs>> {
        let graph = self.clone();
        async move {
            let deps = graph.inner.registry.read().node(&name)?.deps.clone();
            let mut inputs = Inputs::with_capacity(deps.len());
            for dep in deps {
                let qualified = {
                    let registry = graph.inner.registry.read();
                    registry.resolve_dependency(dep.name(), registry.node(&name)?)?
                };
                let input = graph.yield_input(qualified, Some(name.clone())).await?;
                inputs.push(dep.name(), input);
            }
            Ok(inputs)
        }
        .boxed()
    }

    // ------------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------------

    /// Trigger every dependent of `name` except `skip`.
    pub(crate) fn propagate(&self, name: &str, skip: Option<&str>) {
        let out = match self.inner.registry.read().get(name) {
            Some(node) => node.out.clone(),
            None => return,
        };

        for dependent in out {
            if skip == Some(dependent.as_str()) {
                tracing::trace!(source = %name, %dependent, "skipping the reader that forced evaluation");
                continue;
            }
            let graph = self.clone();
            let source = name.to_string();
            self.drive(
                async move {
                    if let Err(err) = graph.trigger(dependent.clone()).await {
                        tracing::error!(%source, %dependent, %err, "propagation failed");
                    }
                }
                .boxed(),
            );
        }
    }

    /// Re-evaluate `name` if every event it reads has fired.
    fn trigger(&self, name: String) -> BoxFuture<'static, Result<()>> {
        let graph = self.clone();
        async move {
            if !graph.inner.registry.read().gate_open(&name)? {
                tracing::trace!(node = %name, "trigger dropped: an event dependency has not fired");
                return Ok(());
            }
            graph.evaluate_for(name, None).await
        }
        .boxed()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Marks a node as evaluating for as long as the guard lives.
pub(crate) struct InFlight {
    graph: Weak<GraphInner>,
    name: String,
}

impl InFlight {
    pub(crate) fn enter(graph: &Graph, name: &str) -> Self {
        if let Some(node) = graph.inner.registry.write().get_mut(name) {
            node.in_flight += 1;
        }
        Self {
            graph: graph.downgrade(),
            name: name.to_string(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(inner) = self.graph.upgrade() {
            if let Some(node) = inner.registry.write().get_mut(&self.name) {
                node.in_flight = node.in_flight.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn new_graph_registers_init_event() {
        let graph = Graph::new();
        assert_eq!(graph.kind("init").unwrap(), NodeKind::Event);
        assert_eq!(graph.len(), 1);

        let bare = Graph::with_config(GraphConfig::bare());
        assert!(bare.is_empty());
    }

    #[test]
    fn reading_an_undefined_node_fails() {
        let graph = Graph::with_config(GraphConfig::bare());
        let err = graph.read("ghost").now_or_never().unwrap().unwrap_err();
        assert_eq!(err, GraphError::UndefinedNode("ghost".into()));
    }

    #[test]
    fn drive_runs_ready_work_in_place() {
        let graph = Graph::with_config(GraphConfig::bare());
        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();
        graph.drive(
            async move {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn in_flight_guard_marks_evaluation() {
        let graph = Graph::with_config(GraphConfig::bare());
        graph
            .define([("s", Definition::synthetic(Vec::<&str>::new(), |_| 1))])
            .unwrap();

        let guard = InFlight::enter(&graph, "s");
        assert_eq!(graph.lifecycle("s").unwrap(), Lifecycle::Evaluating);
        assert_eq!(graph.pending(), ["s"]);
        drop(guard);
        assert_eq!(graph.lifecycle("s").unwrap(), Lifecycle::Uninitialized);
        assert!(graph.pending().is_empty());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let graph = Graph::with_config(GraphConfig::bare());
        graph
            .define([
                ("a", Definition::data(1)),
                ("b", Definition::synthetic(["a"], |_| 2)),
            ])
            .unwrap();

        let json = serde_json::to_value(graph.snapshot()).unwrap();
        assert_eq!(json[0]["name"], "a");
        assert_eq!(json[0]["kind"], "data");
        assert_eq!(json[0]["out"], serde_json::json!(["b"]));
        assert_eq!(json[1]["lifecycle"], "uninitialized");
    }
}
