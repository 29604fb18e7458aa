//! Error types for graph registration, reification and evaluation.

use thiserror::Error;

use crate::graph::NodeKind;

/// Errors raised by the dataflow graph.
///
/// Every variant is unrecoverable at the point of detection; the graph never
/// retries. `define` is not transactional, so a batch that fails part way
/// leaves the definitions before the failing entry installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("illegal definition of '{name}': {reason}")]
    IllegalDefinition { name: String, reason: String },

    #[error("reference to undefined node '{dependency}' as dependency of '{dependent}'{context}")]
    UnresolvedReference {
        dependency: String,
        dependent: String,
        /// Rendered sub-definition context, empty when the dependent was
        /// defined at the top level.
        context: String,
    },

    #[error("cannot yield: '{0}' is not defined")]
    UndefinedNode(String),

    #[error("'{name}' is of kind {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },

    /// A library resolves to a handle, not a value; read it with `read`.
    #[error("'{0}' is a library and has no plain value")]
    NoValue(String),

    #[error("data node '{node}' has no helper named '{helper}'")]
    UnknownHelper { node: String, helper: String },

    #[error("no library loader installed to load '{0}'")]
    NoLoader(String),

    #[error("invalid graph configuration: {0}")]
    Config(String),
}

impl GraphError {
    pub(crate) fn illegal(name: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::IllegalDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn wrong_kind(name: impl Into<String>, expected: NodeKind, found: NodeKind) -> Self {
        GraphError::WrongKind {
            name: name.into(),
            expected,
            found,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Config(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_message_names_both_ends() {
        let err = GraphError::UnresolvedReference {
            dependency: "missing".into(),
            dependent: "total".into(),
            context: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "reference to undefined node 'missing' as dependency of 'total'"
        );
    }

    #[test]
    fn wrong_kind_message_uses_kind_names() {
        let err = GraphError::wrong_kind("clicks", NodeKind::Data, NodeKind::Event);
        assert_eq!(err.to_string(), "'clicks' is of kind event, expected data");
    }

    #[test]
    fn no_value_message_names_the_library() {
        let err = GraphError::NoValue("codec".into());
        assert_eq!(err.to_string(), "'codec' is a library and has no plain value");
    }
}
