//! Name Resolution
//!
//! Dependencies are declared by unqualified name and resolved against the
//! scope chain of the node that declares them. The deepest namespace wins,
//! which gives lexical shadowing: a name defined inside a sub-definition
//! hides a same-named node further out, and the bare global name is the
//! final fallback.

use std::fmt;
use std::sync::Arc;

/// Child name that maps onto its parent's own name.
pub const MAIN: &str = "main";

/// Separator between namespace segments in a qualified name.
pub const SEPARATOR: &str = "_";

/// An ordered chain of enclosing namespace names, outermost first.
///
/// Scopes are cheap to clone and never change once a node is installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    chain: Arc<[String]>,
}

impl Scope {
    /// The empty, global scope.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a scope from an explicit chain.
    pub fn new<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chain: chain.into_iter().map(Into::into).collect(),
        }
    }

    /// The scope entered by a sub-definition named `name`.
    pub fn child(&self, name: &str) -> Self {
        let mut chain = self.chain.to_vec();
        chain.push(name.to_string());
        Self {
            chain: chain.into(),
        }
    }

    /// The scope enclosing this one. The root is its own parent.
    pub fn parent(&self) -> Self {
        match self.chain.split_last() {
            Some((_, rest)) => Self {
                chain: rest.to_vec().into(),
            },
            None => self.clone(),
        }
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn is_root(&self) -> bool {
        self.chain.is_empty()
    }

    /// Candidate qualified names for `name`, deepest first.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        enumerate_scopes(&self.chain, name)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.chain.join(", "))
    }
}

/// Enumerate every namespace-prefixed form of `name`, starting with the
/// deepest.
///
/// ```
/// use tangle_core::graph::enumerate_scopes;
///
/// let chain = ["x".to_string(), "y".to_string(), "z".to_string()];
/// assert_eq!(enumerate_scopes(&chain, "w"), ["x_y_z_w", "x_y_w", "x_w", "w"]);
/// assert_eq!(enumerate_scopes(&chain[..2], "main"), ["x_y", "x", "main"]);
/// ```
pub fn enumerate_scopes(chain: &[String], name: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(chain.len() + 1);
    for len in (1..=chain.len()).rev() {
        let prefix = chain[..len].join(SEPARATOR);
        if name == MAIN {
            candidates.push(prefix);
        } else {
            candidates.push(format!("{prefix}{SEPARATOR}{name}"));
        }
    }
    candidates.push(name.to_string());
    candidates
}

/// Qualified name of a sub-definition child.
pub fn qualify_child(parent: &str, child: &str) -> String {
    if child == MAIN {
        parent.to_string()
    } else {
        format!("{parent}{SEPARATOR}{child}")
    }
}
