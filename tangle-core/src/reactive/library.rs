//! Library Nodes
//!
//! A library is an external resource fetched through the graph's
//! [`LibraryLoader`] the first time it is read. The loader runs at most
//! once per node: reads that arrive while the load is in flight share it,
//! later reads get the cached handle.

use std::any::Any;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;

use super::runtime::Graph;
use crate::error::{GraphError, Result};
use crate::graph::{Body, NodeKind};

/// An opaque loaded resource. Readers downcast it to the loader's type.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// What a library node asks its loader for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySpec {
    /// Qualified name of the library node.
    pub name: String,
    pub path: String,
    /// Export to pick out of the loaded resource, if any.
    pub shim: Option<String>,
}

/// Fetches library resources.
///
/// The returned future may complete immediately, later, or never; a load
/// that never completes leaves the node in [`Lifecycle::Loading`](crate::Lifecycle).
pub trait LibraryLoader: Send + Sync {
    fn load(&self, spec: &LibrarySpec) -> BoxFuture<'static, Handle>;
}

impl<F> LibraryLoader for F
where
    F: Fn(&LibrarySpec) -> BoxFuture<'static, Handle> + Send + Sync,
{
    fn load(&self, spec: &LibrarySpec) -> BoxFuture<'static, Handle> {
        self(spec)
    }
}

pub(crate) enum LoadState {
    Unloaded,
    Loading(Shared<BoxFuture<'static, Handle>>),
    Loaded(Handle),
}

impl Graph {
    /// Yield the handle of library `name`, loading it on first use.
    pub(crate) fn load_library(&self, name: String) -> BoxFuture<'static, Result<Handle>> {
        let graph = self.clone();
        async move {
            let load = {
                let mut registry = graph.inner.registry.write();
                let node = registry.node_mut(&name)?;
                let found = node.kind();
                let Body::Library { spec, load } = &mut node.body else {
                    return Err(GraphError::wrong_kind(&name, NodeKind::Library, found));
                };

                match load {
                    LoadState::Loaded(handle) => return Ok(handle.clone()),
                    LoadState::Loading(shared) => shared.clone(),
                    LoadState::Unloaded => {
                        let loader = graph
                            .inner
                            .loader
                            .read()
                            .clone()
                            .ok_or_else(|| GraphError::NoLoader(name.clone()))?;
                        let spec = spec.clone();
                        tracing::debug!(library = %name, path = %spec.path, "loading library");

                        // The loader is only called on first poll, outside the lock.
                        let shared = async move { loader.load(&spec).await }.boxed().shared();
                        *load = LoadState::Loading(shared.clone());
                        shared
                    }
                }
            };

            let handle = load.await;

            let mut registry = graph.inner.registry.write();
            if let Some(node) = registry.get_mut(&name) {
                if let Body::Library { load, .. } = &mut node.body {
                    if matches!(load, LoadState::Loading(_)) {
                        tracing::debug!(library = %name, "library loaded");
                        *load = LoadState::Loaded(handle.clone());
                        node.invoked = true;
                    }
                }
            }
            Ok(handle)
        }
        .boxed()
    }
}
