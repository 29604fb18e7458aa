//! Node Definitions
//!
//! A [`Definition`] is the raw description of a node handed to
//! [`Graph::define`](crate::Graph::define). The caller picks the kind
//! explicitly; the installer never guesses it from the shape of a value.
//!
//! Computations declare their dependencies by name, in the order their
//! inputs are assembled. A name prefixed with `_` is a silent read: it is
//! part of the inputs but never re-triggers the computation.
//!
//! ```rust,ignore
//! use tangle_core::{Definition, Graph};
//!
//! let graph = Graph::new();
//! graph.define([
//!     ("price", Definition::data(12)),
//!     ("qty", Definition::data(3)),
//!     ("total", Definition::synthetic(["price", "qty"], |inputs| {
//!         let price = inputs.value("price").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let qty = inputs.value("qty").and_then(|v| v.as_i64()).unwrap_or(0);
//!         price * qty
//!     })),
//! ])?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Result;
use crate::graph::{Dependency, Scope};
use crate::reactive::{DataAccessor, EventSetter, Inputs};

/// A result-producing computation. `None` means no result this run.
pub type Compute = Arc<dyn Fn(Inputs) -> BoxFuture<'static, Option<Value>> + Send + Sync>;

/// A side-effecting computation.
pub type Run = Arc<dyn Fn(Inputs) -> BoxFuture<'static, ()> + Send + Sync>;

/// The external source of an event, invoked once at wireup.
pub type Wireup = Box<dyn FnOnce(EventSetter) + Send + Sync>;

/// A named mutator attached to a data node.
pub type Helper = Arc<dyn Fn(&DataAccessor, Vec<Value>) -> Result<Value> + Send + Sync>;

/// An ordered batch of named definitions.
pub type Definitions = Vec<(String, Definition)>;

/// Raw description of a node.
pub enum Definition {
    /// Mutable state with optional named helpers.
    Data {
        value: Value,
        helpers: IndexMap<String, Helper>,
    },

    /// An externally driven value. `coalesce: None` takes the graph default.
    Event {
        default_value: Value,
        coalesce: Option<bool>,
        wireup: Wireup,
    },

    /// An external resource fetched through the graph's loader.
    Library { path: String, shim: Option<String> },

    /// Inside a sub-definition: an alias for `target`, resolved from the
    /// scope enclosing the sub-definition.
    Reference { target: String },

    /// A derived value.
    Synthetic {
        deps: Vec<Dependency>,
        compute: Compute,
        coalesce: bool,
    },

    /// A side effect driven by its dependencies.
    Effect { deps: Vec<Dependency>, run: Run },

    /// A nested namespace. The child `main` takes the parent's name, any
    /// other child `c` becomes `parent_c`.
    Sub(Definitions),
}

fn collect_deps<D>(deps: D) -> Vec<Dependency>
where
    D: IntoIterator,
    D::Item: Into<Dependency>,
{
    deps.into_iter().map(Into::into).collect()
}

impl Definition {
    pub fn data(value: impl Into<Value>) -> Self {
        Definition::Data {
            value: value.into(),
            helpers: IndexMap::new(),
        }
    }

    /// An event whose source is `wireup`. It receives a setter exactly once
    /// and may fire it any number of times afterwards.
    pub fn event<F>(wireup: F) -> Self
    where
        F: FnOnce(EventSetter) + Send + Sync + 'static,
    {
        Definition::Event {
            default_value: Value::Null,
            coalesce: None,
            wireup: Box::new(wireup),
        }
    }

    pub fn library(path: impl Into<String>) -> Self {
        Definition::Library {
            path: path.into(),
            shim: None,
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Definition::Reference {
            target: target.into(),
        }
    }

    /// A coalescing synthetic computed synchronously.
    pub fn synthetic<D, F, R>(deps: D, compute: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<Dependency>,
        F: Fn(&Inputs) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Definition::Synthetic {
            deps: collect_deps(deps),
            compute: Arc::new(move |inputs: Inputs| {
                let value: Value = compute(&inputs).into();
                future::ready(Some(value)).boxed()
            }),
            coalesce: true,
        }
    }

    /// A coalescing synthetic whose result may arrive later, or never.
    pub fn synthetic_async<D, F, Fut>(deps: D, compute: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<Dependency>,
        F: Fn(Inputs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        Definition::Synthetic {
            deps: collect_deps(deps),
            compute: Arc::new(move |inputs: Inputs| compute(inputs).boxed()),
            coalesce: true,
        }
    }

    pub fn effect<D, F>(deps: D, run: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<Dependency>,
        F: Fn(&Inputs) + Send + Sync + 'static,
    {
        Definition::Effect {
            deps: collect_deps(deps),
            run: Arc::new(move |inputs: Inputs| {
                run(&inputs);
                future::ready(()).boxed()
            }),
        }
    }

    pub fn effect_async<D, F, Fut>(deps: D, run: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<Dependency>,
        F: Fn(Inputs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Definition::Effect {
            deps: collect_deps(deps),
            run: Arc::new(move |inputs: Inputs| run(inputs).boxed()),
        }
    }

    pub fn sub<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Definition)>,
        K: Into<String>,
    {
        Definition::Sub(
            children
                .into_iter()
                .map(|(name, definition)| (name.into(), definition))
                .collect(),
        )
    }

    /// Choose whether re-computing an equal value propagates.
    ///
    /// Applies to synthetics and events. A non-coalescing node notifies its
    /// dependents on every commit.
    pub fn coalesce(mut self, enabled: bool) -> Self {
        match &mut self {
            Definition::Synthetic { coalesce, .. } => *coalesce = enabled,
            Definition::Event { coalesce, .. } => *coalesce = Some(enabled),
            other => tracing::warn!(definition = ?other, "coalescing only applies to synthetics and events"),
        }
        self
    }

    /// Initial value of an event before it first fires.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        match &mut self {
            Definition::Event { default_value, .. } => *default_value = value.into(),
            other => tracing::warn!(definition = ?other, "default values only apply to events"),
        }
        self
    }

    /// Attach a named helper to a data definition.
    pub fn with_helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&DataAccessor, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        match &mut self {
            Definition::Data { helpers, .. } => {
                helpers.insert(name.into(), Arc::new(helper));
            }
            other => tracing::warn!(definition = ?other, "helpers only apply to data"),
        }
        self
    }

    pub fn with_shim(mut self, export: impl Into<String>) -> Self {
        match &mut self {
            Definition::Library { shim, .. } => *shim = Some(export.into()),
            other => tracing::warn!(definition = ?other, "shims only apply to libraries"),
        }
        self
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Data { value, helpers } => f
                .debug_struct("Data")
                .field("value", value)
                .field("helpers", &helpers.keys().collect::<Vec<_>>())
                .finish(),
            Definition::Event {
                default_value,
                coalesce,
                ..
            } => f
                .debug_struct("Event")
                .field("default_value", default_value)
                .field("coalesce", coalesce)
                .finish_non_exhaustive(),
            Definition::Library { path, shim } => f
                .debug_struct("Library")
                .field("path", path)
                .field("shim", shim)
                .finish(),
            Definition::Reference { target } => {
                f.debug_struct("Reference").field("target", target).finish()
            }
            Definition::Synthetic { deps, coalesce, .. } => f
                .debug_struct("Synthetic")
                .field("deps", deps)
                .field("coalesce", coalesce)
                .finish_non_exhaustive(),
            Definition::Effect { deps, .. } => f
                .debug_struct("Effect")
                .field("deps", deps)
                .finish_non_exhaustive(),
            Definition::Sub(children) => f
                .debug_map()
                .entries(children.iter().map(|(name, def)| (name, def)))
                .finish(),
        }
    }
}

/// Options for one [`Graph::define_with`](crate::Graph::define_with) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineOptions {
    /// Rebuild the out-graph once the batch is installed.
    pub reify: bool,
    /// Activate event sources once the batch is installed.
    pub wireup: bool,
    /// Scope chain the batch is installed under.
    pub scope: Scope,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            reify: true,
            wireup: true,
            scope: Scope::root(),
        }
    }
}

impl DefineOptions {
    /// Install only; reify and wire up later.
    pub fn deferred() -> Self {
        Self {
            reify: false,
            wireup: false,
            ..Self::default()
        }
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}
