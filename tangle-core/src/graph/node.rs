//! Graph Nodes
//!
//! This module defines the node records that live in the registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use super::resolver::Scope;
use crate::definition::{Compute, Helper, Run, Wireup};
use crate::reactive::{LibrarySpec, LoadState};

/// Names that can never be used for nodes and are dropped from dependency
/// lists.
pub const RESERVED: [&str; 5] = ["result", "respond", "define", "type", "event"];

/// Prefix marking a silent (non-triggering) dependency in its string form.
pub const SILENT_PREFIX: char = '_';

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Mutable state. Every distinct write propagates.
    Data,

    /// A derived value produced by a computation over its dependencies.
    /// It caches its last result.
    Synthetic,

    /// A computation run for its side effects. Effects are leaves: they
    /// hold no value and never propagate.
    Effect,

    /// A value pushed in from an external source after wireup.
    Event,

    /// An external resource loaded once and cached.
    Library,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Data => "data",
            NodeKind::Synthetic => "synthetic",
            NodeKind::Effect => "effect",
            NodeKind::Event => "event",
            NodeKind::Library => "library",
        };
        f.write_str(name)
    }
}

/// Observable evaluation state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Never produced a value. Events that have not fired and synthetics
    /// that have not been evaluated sit here.
    Uninitialized,

    /// An evaluation is in flight, possibly suspended on an asynchronous
    /// dependency.
    Evaluating,

    /// Has produced a value at least once.
    Initialized,

    /// Library not requested yet.
    Unloaded,

    /// Library load in flight.
    Loading,

    /// Library handle cached.
    Loaded,
}

/// A declared dependency of a computation node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    name: String,
    silent: bool,
}

impl Dependency {
    /// A dependency that re-triggers the declaring node when it changes.
    pub fn trigger(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            silent: false,
        }
    }

    /// A dependency that is read during evaluation but never triggers it.
    pub fn silent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            silent: true,
        }
    }

    /// Parse the string form, where a leading underscore marks a silent
    /// read: `"count"` triggers, `"_count"` reads `count` silently.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix(SILENT_PREFIX) {
            Some(name) => Self::silent(name),
            None => Self::trigger(spec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }
}

impl From<&str> for Dependency {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl From<String> for Dependency {
    fn from(spec: String) -> Self {
        Self::parse(&spec)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.silent {
            write!(f, "{SILENT_PREFIX}")?;
        }
        f.write_str(&self.name)
    }
}

/// The sub-definition a node was declared in, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubContext {
    pub name: String,
    /// Reference aliases declared by the sub-definition, as
    /// `(alias, target)` pairs.
    pub references: Vec<(String, String)>,
}

impl fmt::Display for SubContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refs: Vec<String> = self
            .references
            .iter()
            .map(|(alias, target)| format!("'{alias}' ==> '{target}'"))
            .collect();
        write!(f, "named '{}' and references {{{}}}", self.name, refs.join(", "))
    }
}

/// Kind-specific part of a node.
pub(crate) enum Body {
    Data {
        helpers: IndexMap<String, Helper>,
    },
    Synthetic {
        compute: Compute,
        coalesce: bool,
    },
    Effect {
        run: Run,
    },
    Event {
        /// Taken by the wirer; `None` once wired.
        wireup: Option<Wireup>,
        wired_up: bool,
        coalesce: bool,
    },
    Library {
        spec: LibrarySpec,
        load: LoadState,
    },
}

/// A node in the dependency graph.
pub(crate) struct Node {
    /// Fully-qualified, unique name.
    pub(crate) name: String,

    pub(crate) body: Body,

    /// Last computed or assigned value.
    pub(crate) value: Value,

    /// Declared dependencies in declaration order, by unqualified name.
    pub(crate) deps: SmallVec<[Dependency; 4]>,

    /// Fully-qualified dependents. Rebuilt by every reification.
    pub(crate) out: Vec<String>,

    /// Namespace chain used to resolve `deps`.
    pub(crate) scope: Scope,

    /// Whether the node has produced a value at least once.
    pub(crate) invoked: bool,

    /// Number of evaluations currently in flight.
    pub(crate) in_flight: usize,

    pub(crate) context: Option<Arc<SubContext>>,
}

impl Node {
    pub(crate) fn new(
        name: String,
        body: Body,
        value: Value,
        deps: SmallVec<[Dependency; 4]>,
        scope: Scope,
        context: Option<Arc<SubContext>>,
    ) -> Self {
        Self {
            name,
            body,
            value,
            deps,
            out: Vec::new(),
            scope,
            invoked: false,
            in_flight: 0,
            context,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.body {
            Body::Data { .. } => NodeKind::Data,
            Body::Synthetic { .. } => NodeKind::Synthetic,
            Body::Effect { .. } => NodeKind::Effect,
            Body::Event { .. } => NodeKind::Event,
            Body::Library { .. } => NodeKind::Library,
        }
    }

    /// Only nodes that own a computation declare dependencies.
    pub(crate) fn has_computation(&self) -> bool {
        matches!(self.body, Body::Synthetic { .. } | Body::Effect { .. })
    }

    /// Dependencies that may trigger this node.
    pub(crate) fn triggers(&self) -> impl Iterator<Item = &Dependency> {
        self.deps.iter().filter(|dep| !dep.is_silent())
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        match &self.body {
            Body::Library { load, .. } => match load {
                LoadState::Unloaded => Lifecycle::Unloaded,
                LoadState::Loading(_) => Lifecycle::Loading,
                LoadState::Loaded(_) => Lifecycle::Loaded,
            },
            _ if self.in_flight > 0 => Lifecycle::Evaluating,
            Body::Data { .. } | Body::Effect { .. } => Lifecycle::Initialized,
            Body::Synthetic { .. } | Body::Event { .. } if self.invoked => Lifecycle::Initialized,
            Body::Synthetic { .. } | Body::Event { .. } => Lifecycle::Uninitialized,
        }
    }

    pub(crate) fn info(&self) -> NodeInfo {
        NodeInfo {
            name: self.name.clone(),
            kind: self.kind(),
            value: self.value.clone(),
            dependencies: self.deps.iter().map(ToString::to_string).collect(),
            out: self.out.clone(),
            scope: self.scope.chain().to_vec(),
            invoked: self.invoked,
            lifecycle: self.lifecycle(),
        }
    }
}

/// Serializable view of a node, for inspection and debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub kind: NodeKind,
    pub value: Value,
    /// Declared dependencies, silent reads prefixed with `_`.
    pub dependencies: Vec<String>,
    pub out: Vec<String>,
    pub scope: Vec<String>,
    pub invoked: bool,
    pub lifecycle: Lifecycle,
}
