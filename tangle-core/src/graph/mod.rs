//! Dependency Graph
//!
//! This module implements the name-resolved dependency graph: the node
//! registry, scope-qualified name resolution, installation of definitions,
//! and reification of the out-graph.
//!
//! # Overview
//!
//! - Nodes are keyed by fully-qualified name. Sub-definitions namespace
//!   their children by prefixing the parent name (`parent_child`).
//! - A computation declares its dependencies by unqualified name. The name
//!   is resolved against the declaring node's scope chain, deepest
//!   namespace first, so inner definitions shadow outer ones.
//! - Edges point from a dependency to its dependents (`out`) and are
//!   rebuilt from scratch on every reification.
//!
//! # Design Decisions
//!
//! 1. Reification is deferred to the end of a whole batch, sub-definitions
//!    included, so siblings may reference each other regardless of order.
//!
//! 2. The registry is append-only. A node never changes its name, scope or
//!    declared dependencies after installation.

mod install;
mod node;
mod registry;
mod resolver;

pub(crate) use install::{install, Batch};
pub(crate) use node::Body;
pub(crate) use registry::Registry;

pub use node::{Dependency, Lifecycle, NodeInfo, NodeKind, SubContext, RESERVED, SILENT_PREFIX};
pub use resolver::{enumerate_scopes, qualify_child, Scope, MAIN, SEPARATOR};
