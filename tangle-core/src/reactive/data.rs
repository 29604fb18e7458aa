//! Data Nodes
//!
//! Data is the mutable state of a graph. Computations reading a data node
//! receive a [`DataAccessor`] rather than a value, so they can both read
//! the current state and write it back.
//!
//! # Writes
//!
//! A write commits only when the new value differs from the current one.
//! A committed write propagates to every dependent before `set` returns,
//! as far as those dependents can run synchronously.

use std::fmt;
use std::sync::Weak;

use serde_json::Value;

use super::runtime::{Graph, GraphInner};
use crate::error::{GraphError, Result};
use crate::graph::{Body, NodeKind};

/// Read/write handle to one data node.
///
/// Holds only a weak reference to its graph: once the graph is dropped,
/// reads yield `Null` and writes fail with `UndefinedNode`.
#[derive(Clone)]
pub struct DataAccessor {
    graph: Weak<GraphInner>,
    name: String,
}

impl DataAccessor {
    pub(crate) fn new(graph: &Graph, name: String) -> Self {
        Self {
            graph: graph.downgrade(),
            name,
        }
    }

    /// Qualified name of the node behind this accessor.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Value {
        self.graph
            .upgrade()
            .and_then(|inner| {
                inner
                    .registry
                    .read()
                    .get(&self.name)
                    .map(|node| node.value.clone())
            })
            .unwrap_or(Value::Null)
    }

    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.graph()?.set(&self.name, value)
    }

    /// Invoke one of the node's helpers.
    pub fn call(&self, helper: &str, args: Vec<Value>) -> Result<Value> {
        self.graph()?.call(&self.name, helper, args)
    }

    fn graph(&self) -> Result<Graph> {
        self.graph
            .upgrade()
            .map(Graph::from_inner)
            .ok_or_else(|| GraphError::UndefinedNode(self.name.clone()))
    }
}

impl fmt::Debug for DataAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAccessor")
            .field("name", &self.name)
            .field("value", &self.get())
            .finish()
    }
}

impl Graph {
    /// Write a data node, propagating if the value changed.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let _turn = self.inner.turn.lock();
        let value = value.into();
        let changed = {
            let mut registry = self.inner.registry.write();
            let node = registry.node_mut(name)?;
            if node.kind() != NodeKind::Data {
                return Err(GraphError::wrong_kind(name, NodeKind::Data, node.kind()));
            }
            let changed = node.value != value;
            if changed {
                node.value = value;
            }
            changed
        };

        if changed {
            tracing::trace!(node = %name, "data changed");
            self.propagate(name, None);
        }
        Ok(())
    }

    /// Invoke helper `helper` of data node `name` with `args`.
    pub fn call(&self, name: &str, helper: &str, args: Vec<Value>) -> Result<Value> {
        let _turn = self.inner.turn.lock();
        let function = {
            let registry = self.inner.registry.read();
            let node = registry.node(name)?;
            let Body::Data { helpers } = &node.body else {
                return Err(GraphError::wrong_kind(name, NodeKind::Data, node.kind()));
            };
            helpers
                .get(helper)
                .cloned()
                .ok_or_else(|| GraphError::UnknownHelper {
                    node: name.to_string(),
                    helper: helper.to_string(),
                })?
        };

        function(&self.accessor(name)?, args)
    }

    pub fn accessor(&self, name: &str) -> Result<DataAccessor> {
        let kind = self.kind(name)?;
        if kind != NodeKind::Data {
            return Err(GraphError::wrong_kind(name, NodeKind::Data, kind));
        }
        Ok(DataAccessor::new(self, name.to_string()))
    }
}
