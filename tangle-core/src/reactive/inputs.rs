//! Computation Inputs
//!
//! What a computation receives: one [`Input`] per declared dependency, in
//! declaration order, keyed by the dependency's unqualified name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;

use super::data::DataAccessor;
use super::library::Handle;

/// The result of reading one node.
#[derive(Clone)]
pub enum Input {
    /// A data node, read through its accessor.
    Data(DataAccessor),

    /// The value of a synthetic or event. Effects read as `Null`.
    Value(Value),

    /// A loaded library handle.
    Library(Handle),
}

impl Input {
    /// The plain value behind this input. Libraries have none.
    pub fn value(&self) -> Option<Value> {
        match self {
            Input::Data(accessor) => Some(accessor.get()),
            Input::Value(value) => Some(value.clone()),
            Input::Library(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataAccessor> {
        match self {
            Input::Data(accessor) => Some(accessor),
            _ => None,
        }
    }

    /// Downcast a library handle to the type its loader produced.
    pub fn library<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Input::Library(handle) => handle.clone().downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Data(accessor) => f.debug_tuple("Data").field(&accessor.name()).finish(),
            Input::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Input::Library(_) => f.write_str("Library(..)"),
        }
    }
}

/// Inputs of one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    entries: SmallVec<[(String, Input); 4]>,
}

impl Inputs {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SmallVec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, input: Input) {
        self.entries.push((name.to_string(), input));
    }

    pub fn get(&self, name: &str) -> Option<&Input> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, input)| input)
    }

    /// Input at `index` in declaration order.
    pub fn at(&self, index: usize) -> Option<&Input> {
        self.entries.get(index).map(|(_, input)| input)
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(Input::value)
    }

    pub fn data(&self, name: &str) -> Option<&DataAccessor> {
        self.get(name).and_then(Input::as_data)
    }

    pub fn library<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|input| input.library::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.entries.iter().map(|(name, input)| (name.as_str(), input))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
