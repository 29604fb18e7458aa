//! Ready-made definitions for common node shapes.
//!
//! ```rust,ignore
//! use tangle_core::{defs, Graph};
//!
//! let graph = Graph::new();
//! graph.define([
//!     ("ids", defs::counter()),
//!     ("todo", defs::list(vec![])),
//!     ("view", defs::pack(["ids", "todo_array"])),
//! ])?;
//!
//! graph.call("todo", "append", vec!["write docs".into()])?;
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::{Definition, Helper};
use crate::error::Result;
use crate::reactive::DataAccessor;

pub fn data(value: impl Into<Value>) -> Definition {
    Definition::data(value)
}

/// Data with a set of named helpers.
pub fn data_with_helpers<I, K>(value: impl Into<Value>, helpers: I) -> Definition
where
    I: IntoIterator<Item = (K, Helper)>,
    K: Into<String>,
{
    Definition::Data {
        value: value.into(),
        helpers: helpers
            .into_iter()
            .map(|(name, helper)| (name.into(), helper))
            .collect(),
    }
}

pub fn reference(target: impl Into<String>) -> Definition {
    Definition::reference(target)
}

pub fn library(path: impl Into<String>) -> Definition {
    Definition::library(path)
}

/// An integer counter starting at -1. Its `next` helper increments it and
/// returns the new value, which makes it handy for minting ids.
pub fn counter() -> Definition {
    Definition::data(-1).with_helper("next", |data, _| {
        let next = data.get().as_i64().unwrap_or(-1) + 1;
        data.set(next)?;
        Ok(Value::from(next))
    })
}

/// A synthetic gathering the named dependencies into one object, keyed by
/// name. Data dependencies contribute their current value.
pub fn pack<I, S>(names: I) -> Definition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    Definition::synthetic(names, |inputs| {
        let object: Map<String, Value> = inputs
            .iter()
            .map(|(name, input)| (name.to_string(), input.value().unwrap_or_default()))
            .collect();
        Value::Object(object)
    })
}

/// An event that fires the current unix time in milliseconds as soon as it
/// is wired up.
pub fn init_event() -> Definition {
    Definition::event(|setter| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        if let Err(err) = setter.fire(now) {
            tracing::warn!(event = %setter.name(), %err, "init event could not fire");
        }
    })
}

/// One edit of a list: remove `remove` items at `index`, then insert
/// `insert` there.
///
/// A negative index counts from the end, `-1` being the position after the
/// last item. `seq` increases with every command so that two identical
/// edits in a row are still distinct writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Splice {
    pub seq: u64,
    pub index: i64,
    pub remove: usize,
    pub insert: Vec<Value>,
}

impl Splice {
    pub fn apply(&self, items: &mut Vec<Value>) {
        let len = items.len() as i64;
        let start = if self.index >= 0 {
            self.index
        } else {
            len + 1 + self.index
        };
        let start = start.clamp(0, len) as usize;
        let end = start.saturating_add(self.remove).min(items.len());
        items.splice(start..end, self.insert.iter().cloned());
    }
}

fn issue(data: &DataAccessor, index: i64, remove: usize, insert: Vec<Value>) -> Result<Value> {
    let seq = data.get().get("seq").and_then(Value::as_u64).unwrap_or(0) + 1;
    let command = Splice {
        seq,
        index,
        remove,
        insert,
    };
    data.set(serde_json::to_value(&command)?)?;
    Ok(Value::Null)
}

fn arg_index(args: &[Value], at: usize) -> i64 {
    args.get(at).and_then(Value::as_i64).unwrap_or(0)
}

fn arg_items(args: &[Value], at: usize) -> Vec<Value> {
    match args.get(at) {
        Some(Value::Array(items)) => items.clone(),
        Some(item) => vec![item.clone()],
        None => Vec::new(),
    }
}

/// A list edited through splice commands.
///
/// Installs three nodes under the list's name `l`:
/// - `l_array`: the items themselves.
/// - `l`: the last command, with helpers `splice(index, remove, items)`,
///   `prepend(item)`, `append(item)` and `update_at(index, item)`.
/// - `l_updater`: applies each new command to `l_array`.
pub fn list(items: Vec<Value>) -> Definition {
    let command = serde_json::to_value(Splice::default()).unwrap_or_default();

    let splice: Helper = Arc::new(|data: &DataAccessor, args: Vec<Value>| {
        let remove = args.get(1).and_then(Value::as_u64).unwrap_or(0) as usize;
        issue(data, arg_index(&args, 0), remove, arg_items(&args, 2))
    });
    let prepend: Helper =
        Arc::new(|data: &DataAccessor, args: Vec<Value>| issue(data, 0, 0, arg_items(&args, 0)));
    let append: Helper =
        Arc::new(|data: &DataAccessor, args: Vec<Value>| issue(data, -1, 0, arg_items(&args, 0)));
    let update_at: Helper = Arc::new(|data: &DataAccessor, args: Vec<Value>| {
        issue(data, arg_index(&args, 0), 1, arg_items(&args, 1))
    });

    Definition::sub([
        ("array", Definition::data(items)),
        (
            "main",
            data_with_helpers(
                command,
                [
                    ("splice", splice),
                    ("prepend", prepend),
                    ("append", append),
                    ("update_at", update_at),
                ],
            ),
        ),
        (
            "updater",
            Definition::effect(["main", "_array"], |inputs| {
                let (Some(main), Some(array)) = (inputs.data("main"), inputs.data("array")) else {
                    tracing::warn!("list updater is missing its command or its items");
                    return;
                };
                let command: Splice = match serde_json::from_value(main.get()) {
                    Ok(command) => command,
                    Err(err) => {
                        tracing::warn!(list = %main.name(), %err, "ignoring malformed list command");
                        return;
                    }
                };

                let mut items = match array.get() {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                };
                command.apply(&mut items);
                if let Err(err) = array.set(items) {
                    tracing::error!(list = %main.name(), %err, "failed to store list items");
                }
            }),
        ),
    ])
}
