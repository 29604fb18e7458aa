//! Node Registry
//!
//! The registry owns every node of a graph, keyed by fully-qualified name,
//! plus the reference aliases declared by sub-definitions. It is
//! append-only: nodes are never removed once installed.
//!
//! # Reification
//!
//! Each node records two subtly different edge sets. `deps` lists how to
//! assemble the node's inputs; `out` lists which nodes a change to this node
//! may trigger. Silent reads appear in the former but not the latter, so only
//! the out-graph is materialized.
//!
//! `out` cannot be maintained incrementally: dependencies are names resolved
//! relative to scope, and a later registration can change which node an
//! existing name resolves to. Reification therefore recomputes every edge
//! from the current bindings.

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::node::{Node, NodeKind};
use super::resolver::Scope;
use crate::error::{GraphError, Result};

/// A name declared by a sub-definition that stands for another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Alias {
    pub(crate) target: String,
    /// Scope the target is resolved from.
    pub(crate) scope: Scope,
}

/// All nodes and aliases of one graph, indexed by qualified name.
#[derive(Default)]
pub(crate) struct Registry {
    nodes: IndexMap<String, Node>,
    aliases: IndexMap<String, Alias>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is taken by a node or an alias.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Add a node. Names are unique across nodes and aliases.
    pub(crate) fn insert(&mut self, node: Node) -> Result<()> {
        if self.contains(&node.name) {
            return Err(GraphError::illegal(&node.name, "name is already defined"));
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    pub(crate) fn insert_alias(&mut self, name: String, alias: Alias) -> Result<()> {
        if self.contains(&name) {
            return Err(GraphError::illegal(&name, "name is already defined"));
        }
        self.aliases.insert(name, alias);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Look up a node, failing with `UndefinedNode`.
    pub(crate) fn node(&self, name: &str) -> Result<&Node> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UndefinedNode(name.to_string()))
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| GraphError::UndefinedNode(name.to_string()))
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Number of nodes, aliases excluded.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve `name` as seen from `scope` to a qualified node name.
    ///
    /// The deepest candidate that exists wins. A candidate naming an alias
    /// is followed to its target; alias cycles resolve to `None`.
    pub(crate) fn resolve(&self, name: &str, scope: &Scope) -> Option<String> {
        let mut visited = SmallVec::<[String; 2]>::new();
        self.resolve_from(name, scope, &mut visited)
    }

    fn resolve_from(
        &self,
        name: &str,
        scope: &Scope,
        visited: &mut SmallVec<[String; 2]>,
    ) -> Option<String> {
        for candidate in scope.candidates(name) {
            if self.nodes.contains_key(&candidate) {
                tracing::trace!(%name, %scope, resolved = %candidate, "resolved name");
                return Some(candidate);
            }
            if let Some(alias) = self.aliases.get(&candidate) {
                if visited.contains(&candidate) {
                    tracing::warn!(alias = %candidate, "reference cycle while resolving '{name}'");
                    return None;
                }
                visited.push(candidate);
                return self.resolve_from(&alias.target, &alias.scope, visited);
            }
        }
        None
    }

    /// Rebuild the out-list of every node from the current bindings.
    ///
    /// Edges are computed before any node is touched, so a failed pass
    /// leaves the previous edge set intact. Returns the number of edges.
    pub(crate) fn reify(&mut self) -> Result<usize> {
        let mut edges: Vec<(String, String)> = Vec::new();

        for node in self.nodes.values() {
            if !node.has_computation() {
                continue;
            }
            for dep in node.triggers() {
                match self.resolve(dep.name(), &node.scope) {
                    Some(qualified) => edges.push((qualified, node.name.clone())),
                    None => return Err(Self::unresolved(dep.name(), node)),
                }
            }
        }

        for node in self.nodes.values_mut() {
            node.out.clear();
        }

        let mut count = 0;
        for (dependency, dependent) in edges {
            if let Some(node) = self.nodes.get_mut(&dependency) {
                if !node.out.contains(&dependent) {
                    node.out.push(dependent);
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    /// Whether every event that `name` reads (silently or not) has fired.
    ///
    /// Non-event dependencies never close the gate.
    pub(crate) fn gate_open(&self, name: &str) -> Result<bool> {
        let node = self.node(name)?;
        for dep in &node.deps {
            let qualified = self
                .resolve(dep.name(), &node.scope)
                .ok_or_else(|| Self::unresolved(dep.name(), node))?;
            let target = self.node(&qualified)?;
            if target.kind() == NodeKind::Event && !target.invoked {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolve a dependency of `node` or fail with `UnresolvedReference`.
    pub(crate) fn resolve_dependency(&self, dependency: &str, node: &Node) -> Result<String> {
        self.resolve(dependency, &node.scope)
            .ok_or_else(|| Self::unresolved(dependency, node))
    }

    pub(crate) fn unresolved(dependency: &str, node: &Node) -> GraphError {
        GraphError::UnresolvedReference {
            dependency: dependency.to_string(),
            dependent: node.name.clone(),
            context: node
                .context
                .as_ref()
                .map(|context| format!(" in context {context}"))
                .unwrap_or_default(),
        }
    }
}
