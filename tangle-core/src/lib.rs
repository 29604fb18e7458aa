//! Tangle Core
//!
//! This crate provides the runtime for Tangle, a reactive dataflow graph
//! whose nodes find each other by name. It implements:
//!
//! - Scope-qualified name resolution with lexical shadowing
//! - Installation of node definitions, including nested sub-definitions
//! - Reification of the dependency graph
//! - Evaluation and change propagation, synchronous or suspended
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node registry, name resolution and reification
//! - `reactive`: The [`Graph`] handle, evaluation and propagation
//! - `definition`: Raw node descriptions handed to [`Graph::define`]
//! - `defs`: Ready-made definitions (counters, lists, packs)
//!
//! # Example
//!
//! ```rust,ignore
//! use tangle_core::{Definition, Graph};
//!
//! let graph = Graph::new();
//! graph.define([
//!     ("count", Definition::data(1)),
//!     ("doubled", Definition::synthetic(["count"], |inputs| {
//!         inputs.value("count").and_then(|v| v.as_i64()).unwrap_or(0) * 2
//!     })),
//!     ("log", Definition::effect(["doubled"], |inputs| {
//!         println!("doubled: {:?}", inputs.value("doubled"));
//!     })),
//! ])?;
//!
//! // The effect runs before `set` returns, printing "doubled: Some(Number(10))"
//! graph.set("count", 5)?;
//! ```

pub mod config;
pub mod defs;
pub mod definition;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::GraphConfig;
pub use definition::{DefineOptions, Definition, Definitions};
pub use error::{GraphError, Result};
pub use graph::{Dependency, Lifecycle, NodeInfo, NodeKind, Scope};
pub use reactive::{
    DataAccessor, EventSetter, Graph, Handle, Input, Inputs, LibraryLoader, LibrarySpec,
};
pub use serde_json::Value;
