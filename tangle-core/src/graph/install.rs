//! Installation of definitions into the registry.
//!
//! Installing never reifies or wires anything; the caller decides when the
//! batch is complete. Sub-definitions recurse through the same path with a
//! deeper scope and a name prefix.

use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;

use super::node::{Body, Dependency, Node, SubContext, RESERVED, SILENT_PREFIX};
use super::registry::{Alias, Registry};
use super::resolver::{qualify_child, Scope, MAIN};
use crate::config::GraphConfig;
use crate::definition::{Definition, Definitions};
use crate::error::{GraphError, Result};
use crate::reactive::{LibrarySpec, LoadState};

/// Where a batch of definitions is installed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Batch {
    scope: Scope,
    /// Qualified name of the enclosing sub-definition, if any.
    prefix: Option<String>,
    context: Option<Arc<SubContext>>,
}

impl Batch {
    /// A top-level batch. Names are installed exactly as given.
    pub(crate) fn top(scope: Scope) -> Self {
        Self {
            scope,
            prefix: None,
            context: None,
        }
    }
}

/// Install `definitions` in order. Entries before a failing one stay
/// installed.
pub(crate) fn install(
    registry: &mut Registry,
    definitions: Definitions,
    batch: &Batch,
    config: &GraphConfig,
) -> Result<()> {
    for (local, definition) in definitions {
        let name = match &batch.prefix {
            Some(prefix) => qualify_child(prefix, &local),
            None => local.clone(),
        };
        validate(registry, &name)?;

        let (body, value, deps) = match definition {
            Definition::Data { value, helpers } => (Body::Data { helpers }, value, SmallVec::new()),
            Definition::Event {
                default_value,
                coalesce,
                wireup,
            } => (
                Body::Event {
                    wireup: Some(wireup),
                    wired_up: false,
                    coalesce: coalesce.unwrap_or(config.event_coalesce),
                },
                default_value,
                SmallVec::new(),
            ),
            Definition::Library { path, shim } => (
                Body::Library {
                    spec: LibrarySpec {
                        name: name.clone(),
                        path,
                        shim,
                    },
                    load: LoadState::Unloaded,
                },
                Value::Null,
                SmallVec::new(),
            ),
            Definition::Synthetic {
                deps,
                compute,
                coalesce,
            } => (
                Body::Synthetic { compute, coalesce },
                Value::Null,
                dependencies(&name, deps)?,
            ),
            Definition::Effect { deps, run } => {
                (Body::Effect { run }, Value::Null, dependencies(&name, deps)?)
            }
            Definition::Reference { target } => {
                if batch.prefix.is_none() {
                    return Err(GraphError::illegal(
                        name,
                        "references are only meaningful inside a sub-definition",
                    ));
                }
                tracing::debug!(alias = %name, %target, "installed reference");
                registry.insert_alias(
                    name,
                    Alias {
                        target,
                        scope: batch.scope.parent(),
                    },
                )?;
                continue;
            }
            Definition::Sub(children) => {
                install_sub(registry, name, &local, children, batch, config)?;
                continue;
            }
        };

        let node = Node::new(
            name,
            body,
            value,
            deps,
            batch.scope.clone(),
            batch.context.clone(),
        );
        tracing::debug!(node = %node.name, kind = %node.kind(), scope = %node.scope, "installed node");
        registry.insert(node)?;
    }
    Ok(())
}

fn install_sub(
    registry: &mut Registry,
    name: String,
    local: &str,
    children: Definitions,
    batch: &Batch,
    config: &GraphConfig,
) -> Result<()> {
    if children.is_empty() {
        return Err(GraphError::illegal(
            name,
            "could not determine the meaning of an empty sub-definition",
        ));
    }

    let references = children
        .iter()
        .filter_map(|(child, definition)| match definition {
            Definition::Reference { target } => Some((child.clone(), target.clone())),
            _ => None,
        })
        .collect();

    // A `main` sub-definition shares its parent's prefix, so it shares its
    // parent's scope too.
    let scope = if local == MAIN && batch.prefix.is_some() {
        batch.scope.clone()
    } else {
        batch.scope.child(local)
    };

    tracing::debug!(sub = %name, %scope, children = children.len(), "installing sub-definition");
    let inner = Batch {
        scope,
        context: Some(Arc::new(SubContext {
            name: name.clone(),
            references,
        })),
        prefix: Some(name),
    };
    install(registry, children, &inner, config)
}

fn validate(registry: &Registry, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GraphError::illegal(name, "names cannot be empty"));
    }
    if name.starts_with(SILENT_PREFIX) {
        return Err(GraphError::illegal(name, "names cannot begin with an underscore"));
    }
    if RESERVED.contains(&name) {
        return Err(GraphError::illegal(name, format!("{name} is a reserved word")));
    }
    if registry.contains(name) {
        return Err(GraphError::illegal(name, format!("{name} is already defined")));
    }
    Ok(())
}

/// Keep declared dependencies in order, dropping reserved words.
fn dependencies(node: &str, deps: Vec<Dependency>) -> Result<SmallVec<[Dependency; 4]>> {
    let mut kept = SmallVec::new();
    for dep in deps {
        if dep.name().is_empty() {
            return Err(GraphError::illegal(node, "dependency names cannot be empty"));
        }
        if RESERVED.contains(&dep.name()) {
            tracing::trace!(%node, dependency = %dep, "dropping reserved word from dependencies");
            continue;
        }
        kept.push(dep);
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    fn run(registry: &mut Registry, definitions: Vec<(&str, Definition)>) -> Result<()> {
        let definitions = definitions
            .into_iter()
            .map(|(name, def)| (name.to_string(), def))
            .collect();
        install(registry, definitions, &Batch::top(Scope::root()), &GraphConfig::bare())
    }

    #[test]
    fn sub_definition_children_are_prefixed() {
        let mut registry = Registry::new();
        run(
            &mut registry,
            vec![(
                "x",
                Definition::sub([
                    ("main", Definition::data(1)),
                    ("foo", Definition::synthetic(["main"], |_| 2)),
                ]),
            )],
        )
        .unwrap();

        let main = registry.get("x").unwrap();
        assert_eq!(main.kind(), NodeKind::Data);
        assert_eq!(main.scope.chain(), ["x"]);

        let foo = registry.get("x_foo").unwrap();
        assert_eq!(foo.kind(), NodeKind::Synthetic);
        assert_eq!(registry.resolve("main", &foo.scope).as_deref(), Some("x"));
        assert_eq!(foo.context.as_ref().unwrap().name, "x");
    }

    #[test]
    fn nested_sub_definitions_keep_scope_and_prefix_in_step() {
        let mut registry = Registry::new();
        run(
            &mut registry,
            vec![(
                "x",
                Definition::sub([(
                    "y",
                    Definition::sub([("w", Definition::data(0)), ("z", Definition::data(0))]),
                )]),
            )],
        )
        .unwrap();

        let z = registry.get("x_y_z").unwrap();
        assert_eq!(z.scope.chain(), ["x", "y"]);
        assert_eq!(registry.resolve("w", &z.scope).as_deref(), Some("x_y_w"));
    }

    #[test]
    fn illegal_names_are_rejected() {
        let mut registry = Registry::new();
        for name in ["_hidden", "result", "respond", "define", "type", "event", ""] {
            let err = run(&mut registry, vec![(name, Definition::data(0))]).unwrap_err();
            assert!(
                matches!(err, GraphError::IllegalDefinition { .. }),
                "{name:?} should be illegal"
            );
        }
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn failing_batch_keeps_earlier_entries() {
        let mut registry = Registry::new();
        let err = run(
            &mut registry,
            vec![
                ("first", Definition::data(1)),
                ("first", Definition::data(2)),
                ("third", Definition::data(3)),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::IllegalDefinition { ref name, .. } if name == "first"));
        assert!(registry.contains("first"));
        assert!(!registry.contains("third"));
    }

    #[test]
    fn empty_sub_definition_is_illegal() {
        let mut registry = Registry::new();
        let err = run(&mut registry, vec![("nothing", Definition::Sub(Vec::new()))]).unwrap_err();
        assert!(matches!(err, GraphError::IllegalDefinition { .. }));
    }

    #[test]
    fn top_level_reference_is_illegal() {
        let mut registry = Registry::new();
        let err = run(&mut registry, vec![("alias", Definition::reference("x"))]).unwrap_err();
        assert!(matches!(err, GraphError::IllegalDefinition { .. }));
    }

    #[test]
    fn reserved_dependencies_are_dropped() {
        let mut registry = Registry::new();
        run(
            &mut registry,
            vec![("s", Definition::synthetic(["a", "result", "_respond"], |_| 0))],
        )
        .unwrap();
        let names: Vec<&str> = registry.get("s").unwrap().deps.iter().map(Dependency::name).collect();
        assert_eq!(names, ["a"]);
    }

    #[test]
    fn events_take_the_configured_coalescing_default() {
        let mut registry = Registry::new();
        let config = GraphConfig {
            event_coalesce: true,
            ..GraphConfig::bare()
        };
        let definitions = vec![
            ("plain".to_string(), Definition::event(|_| {})),
            ("loud".to_string(), Definition::event(|_| {}).coalesce(false)),
        ];
        install(&mut registry, definitions, &Batch::top(Scope::root()), &config).unwrap();

        let coalesce = |name: &str| match &registry.get(name).unwrap().body {
            Body::Event { coalesce, .. } => *coalesce,
            _ => unreachable!(),
        };
        assert!(coalesce("plain"));
        assert!(!coalesce("loud"));
    }

    #[test]
    fn references_record_context_and_resolve_outward() {
        let mut registry = Registry::new();
        run(
            &mut registry,
            vec![
                ("period", Definition::data(1000)),
                (
                    "tick",
                    Definition::sub([
                        ("ref", Definition::reference("period")),
                        ("main", Definition::synthetic(["ref"], |_| 0)),
                    ]),
                ),
            ],
        )
        .unwrap();

        let tick = registry.get("tick").unwrap();
        assert_eq!(
            tick.context.as_ref().unwrap().references,
            [("ref".to_string(), "period".to_string())]
        );
        assert_eq!(registry.resolve("ref", &tick.scope).as_deref(), Some("period"));
    }
}
