//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tangle_core::{Definition, Graph, GraphConfig, Inputs, Value};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A graph without the built-in `init` event.
#[allow(dead_code)]
pub fn bare_graph() -> Graph {
    init_logging();
    Graph::with_config(GraphConfig::bare())
}

/// An effect over `deps` that records the value of `watched` on every run.
#[allow(dead_code)]
pub fn recorder(deps: &[&str], watched: &str) -> (Definition, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let watched = watched.to_string();
    let effect = Definition::effect(deps.to_vec(), move |inputs: &Inputs| {
        log.lock().push(inputs.value(&watched).unwrap_or_default());
    });
    (effect, seen)
}

/// Integer value of input `name`, or 0.
#[allow(dead_code)]
pub fn int(inputs: &Inputs, name: &str) -> i64 {
    inputs.value(name).and_then(|v| v.as_i64()).unwrap_or(0)
}
