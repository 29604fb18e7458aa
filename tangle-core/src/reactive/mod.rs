//! Reactive Evaluation
//!
//! This module implements evaluation and propagation over the dependency
//! graph: reading nodes, running computations, committing results and
//! notifying dependents.
//!
//! # Concepts
//!
//! ## Data
//!
//! Mutable state. A computation reading a data node receives an accessor
//! it can read and write through.
//!
//! ## Synthetics
//!
//! Derived values. A synthetic caches its last result, computes on first
//! read, and re-computes whenever a trigger dependency commits.
//!
//! ## Effects
//!
//! Side effects driven by their dependencies. Effects hold no value and
//! never propagate.
//!
//! ## Events
//!
//! Values pushed in from outside. An event that has never fired holds back
//! every computation that reads it.
//!
//! ## Libraries
//!
//! External resources, loaded once through a [`LibraryLoader`] and cached.
//!
//! # Implementation Notes
//!
//! Dependencies are declared up front and resolved by name, not tracked at
//! run time. A read is a future so that a computation can wait on a
//! dependency that is not available yet (a library still loading, a
//! computation whose result arrives later) without blocking its siblings.
//! Suspended reads resume on a single driver task, never concurrently with
//! one another or with a commit.

mod data;
mod driver;
mod effect;
mod event;
mod inputs;
mod library;
mod runtime;
mod synthetic;

pub use data::DataAccessor;
pub use event::EventSetter;
pub use inputs::{Input, Inputs};
pub use library::{Handle, LibraryLoader, LibrarySpec};
pub use runtime::Graph;

pub(crate) use library::LoadState;
