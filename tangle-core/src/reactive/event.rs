//! Event Nodes
//!
//! An event is a value pushed in from outside the graph. Its source is
//! handed an [`EventSetter`] once, at wireup, and fires it whenever the
//! outside world has something new.
//!
//! Until an event fires for the first time it gates every computation that
//! reads it: triggers reaching such a computation are dropped.

use std::fmt;
use std::sync::Weak;

use serde_json::Value;

use super::runtime::{Graph, GraphInner};
use crate::definition::Wireup;
use crate::error::{GraphError, Result};
use crate::graph::{Body, NodeKind};

/// Handle through which an event source fires its event.
#[derive(Clone)]
pub struct EventSetter {
    graph: Weak<GraphInner>,
    name: String,
}

impl EventSetter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commit a new value. Fails with `UndefinedNode` once the graph is
    /// gone, which tells long-running sources to stop.
    pub fn fire(&self, value: impl Into<Value>) -> Result<()> {
        match self.graph.upgrade() {
            Some(inner) => Graph::from_inner(inner).fire(&self.name, value),
            None => Err(GraphError::UndefinedNode(self.name.clone())),
        }
    }
}

impl fmt::Debug for EventSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSetter").field("name", &self.name).finish()
    }
}

impl Graph {
    /// Fire event `name` with `value`.
    ///
    /// Dependents are triggered on the first firing, on every firing of a
    /// non-coalescing event, and otherwise only when the value changed.
    pub fn fire(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let _turn = self.inner.turn.lock();
        let value = value.into();
        let notify = {
            let mut registry = self.inner.registry.write();
            let node = registry.node_mut(name)?;
            let found = node.kind();
            let Body::Event { coalesce, .. } = node.body else {
                return Err(GraphError::wrong_kind(name, NodeKind::Event, found));
            };
            let first = !node.invoked;
            let changed = node.value != value;
            node.invoked = true;
            node.value = value;
            first || changed || !coalesce
        };

        if notify {
            tracing::trace!(event = %name, "event fired");
            self.propagate(name, None);
        } else {
            tracing::trace!(event = %name, "event value unchanged; coalesced");
        }
        Ok(())
    }

    /// Hand every event source not yet wired its setter.
    ///
    /// Each source is invoked at most once over the life of the graph.
    pub fn wireup(&self) {
        let sources: Vec<(String, Wireup)> = {
            let mut registry = self.inner.registry.write();
            registry
                .nodes_mut()
                .filter_map(|node| match &mut node.body {
                    Body::Event {
                        wireup, wired_up, ..
                    } if !*wired_up => {
                        *wired_up = true;
                        wireup.take().map(|source| (node.name.clone(), source))
                    }
                    _ => None,
                })
                .collect()
        };

        if !sources.is_empty() {
            tracing::debug!(events = sources.len(), "wiring up event sources");
        }
        for (name, source) in sources {
            source(EventSetter {
                graph: self.downgrade(),
                name,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::definition::{DefineOptions, Definition};
    use crate::graph::Lifecycle;
    use futures_util::FutureExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn sources_are_wired_exactly_once() {
        let setters = Arc::new(Mutex::new(Vec::new()));
        let store = setters.clone();

        let graph = Graph::with_config(GraphConfig::bare());
        graph
            .define_with(
                [(
                    "clicks",
                    Definition::event(move |setter| store.lock().push(setter)),
                )],
                DefineOptions::deferred(),
            )
            .unwrap();
        assert!(setters.lock().is_empty());

        graph.wireup();
        graph.wireup();
        assert_eq!(setters.lock().len(), 1);
        assert_eq!(setters.lock()[0].name(), "clicks");
    }

    #[test]
    fn setter_fires_into_the_graph() {
        let setter = Arc::new(Mutex::new(None));
        let store = setter.clone();

        let graph = Graph::with_config(GraphConfig::bare());
        graph
            .define([(
                "key",
                Definition::event(move |s| *store.lock() = Some(s)).with_default("none"),
            )])
            .unwrap();

        assert_eq!(graph.lifecycle("key").unwrap(), Lifecycle::Uninitialized);
        let value = graph.value("key").now_or_never().unwrap().unwrap();
        assert_eq!(value, Value::from("none"));

        let fired = setter.lock().clone().unwrap();
        fired.fire("enter").unwrap();
        let value = graph.value("key").now_or_never().unwrap().unwrap();
        assert_eq!(value, Value::from("enter"));
        assert_eq!(graph.lifecycle("key").unwrap(), Lifecycle::Initialized);

        drop(graph);
        assert!(fired.fire("late").is_err());
    }

    #[test]
    fn fire_rejects_non_events() {
        let graph = Graph::with_config(GraphConfig::bare());
        graph.define([("d", Definition::data(0))]).unwrap();
        assert!(matches!(graph.fire("d", 1), Err(GraphError::WrongKind { .. })));
    }
}
