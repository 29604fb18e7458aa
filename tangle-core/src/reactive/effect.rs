//! Effect Nodes
//!
//! An effect reads its dependencies exactly like a synthetic, then runs its
//! action. Effects are leaves: they hold no value, never propagate, and
//! read as `Null`.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::runtime::{Graph, InFlight};
use crate::error::{GraphError, Result};
use crate::graph::{Body, NodeKind};

impl Graph {
    pub(crate) fn run_effect(&self, name: String) -> BoxFuture<'static, Result<()>> {
        let graph = self.clone();
        async move {
            let run = {
                let registry = graph.inner.registry.read();
                let node = registry.node(&name)?;
                match &node.body {
                    Body::Effect { run } => run.clone(),
                    _ => return Err(GraphError::wrong_kind(&name, NodeKind::Effect, node.kind())),
                }
            };

            let _in_flight = InFlight::enter(&graph, &name);
            let inputs = graph.gather(name.clone()).await?;
            run(inputs).await;

            if let Some(node) = graph.inner.registry.write().get_mut(&name) {
                node.invoked = true;
            }
            tracing::trace!(effect = %name, "effect ran");
            Ok(())
        }
        .boxed()
    }
}
