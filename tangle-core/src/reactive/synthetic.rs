//! Synthetic Nodes
//!
//! A synthetic is a derived value: a computation over its dependencies
//! whose last result is cached on the node.
//!
//! # How Synthetics Work
//!
//! 1. The first read of a synthetic forces an evaluation; later reads
//!    return the cached value.
//!
//! 2. When a trigger dependency changes, the synthetic re-evaluates, reading
//!    every dependency in declaration order.
//!
//! 3. A coalescing synthetic propagates only when the new result differs
//!    from the cached one. A non-coalescing one propagates every result.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use super::runtime::{Graph, InFlight};
use crate::error::{GraphError, Result};
use crate::graph::{Body, NodeKind};

impl Graph {
    pub(crate) fn evaluate_synthetic(
        &self,
        name: String,
        requester: Option<String>,
    ) -> BoxFuture<'static, Result<()>> {
        let graph = self.clone();
        async move {
            let compute = {
                let registry = graph.inner.registry.read();
                let node = registry.node(&name)?;
                match &node.body {
                    Body::Synthetic { compute, .. } => compute.clone(),
                    _ => return Err(GraphError::wrong_kind(&name, NodeKind::Synthetic, node.kind())),
                }
            };

            let _in_flight = InFlight::enter(&graph, &name);
            let inputs = graph.gather(name.clone()).await?;
            match compute(inputs).await {
                Some(value) => graph.commit(&name, value, requester.as_deref()),
                None => {
                    tracing::trace!(node = %name, "computation produced no result");
                    Ok(())
                }
            }
        }
        .boxed()
    }

    /// Store a synthetic's result and notify dependents other than `skip`.
    fn commit(&self, name: &str, value: Value, skip: Option<&str>) -> Result<()> {
        let changed = {
            let mut registry = self.inner.registry.write();
            let node = registry.node_mut(name)?;
            let found = node.kind();
            let Body::Synthetic { coalesce, .. } = node.body else {
                return Err(GraphError::wrong_kind(name, NodeKind::Synthetic, found));
            };
            node.invoked = true;
            let changed = !coalesce || node.value != value;
            if changed {
                node.value = value;
            }
            changed
        };

        if changed {
            self.propagate(name, skip);
        } else {
            tracing::trace!(node = %name, "result unchanged; coalesced");
        }
        Ok(())
    }

    /// Preset a synthetic's value and mark it invoked without running it.
    ///
    /// Nothing propagates; the next read returns `value` directly.
    pub fn initialize(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let mut registry = self.inner.registry.write();
        let node = registry.node_mut(name)?;
        if node.kind() != NodeKind::Synthetic {
            return Err(GraphError::wrong_kind(name, NodeKind::Synthetic, node.kind()));
        }
        node.value = value.into();
        node.invoked = true;
        Ok(())
    }
}
