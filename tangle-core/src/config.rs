//! Graph Configuration
//!
//! Options that shape a freshly built graph. They can be constructed in code
//! or parsed from JSON, with every field optional:
//!
//! ```json
//! { "init_event": true, "event_coalesce": false }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Construction-time options for a [`Graph`](crate::Graph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Pre-register an `init` event that fires once as soon as it is wired.
    ///
    /// Nodes that should run when the graph comes up can depend on `init`.
    pub init_event: bool,

    /// Coalescing mode for event definitions that do not choose one.
    pub event_coalesce: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            init_event: true,
            event_coalesce: false,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(source: &str) -> Result<Self> {
        let config = serde_json::from_str(source)?;
        tracing::debug!(?config, "parsed graph configuration");
        Ok(config)
    }

    /// A configuration with no pre-registered nodes.
    pub fn bare() -> Self {
        Self {
            init_event: false,
            ..Self::default()
        }
    }
}
