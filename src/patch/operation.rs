//! Patch operations
//!
//! The wire shape is exactly RFC 6902:
//! `{"op":"add","path":"/lastName","value":"Lee"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{PatchApplyError, PatchFailure};
use super::pointer::JsonPointer;

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Insert into an object or array, or replace the whole document at `""`
    Add {
        /// Target location
        path: JsonPointer,
        /// Value to insert
        value: Value,
    },
    /// Remove an existing value
    Remove {
        /// Target location
        path: JsonPointer,
    },
    /// Replace an existing value
    Replace {
        /// Target location
        path: JsonPointer,
        /// New value
        value: Value,
    },
    /// Remove from `from` and add at `path`
    Move {
        /// Source location
        from: JsonPointer,
        /// Destination location
        path: JsonPointer,
    },
    /// Copy the value at `from` to `path`
    Copy {
        /// Source location
        from: JsonPointer,
        /// Destination location
        path: JsonPointer,
    },
    /// Assert that `path` holds `value`
    Test {
        /// Location to check
        path: JsonPointer,
        /// Expected value
        value: Value,
    },
}

impl Operation {
    pub fn add(path: JsonPointer, value: impl Into<Value>) -> Self {
        Operation::Add {
            path,
            value: value.into(),
        }
    }

    pub fn remove(path: JsonPointer) -> Self {
        Operation::Remove { path }
    }

    pub fn replace(path: JsonPointer, value: impl Into<Value>) -> Self {
        Operation::Replace {
            path,
            value: value.into(),
        }
    }

    pub fn move_value(from: JsonPointer, path: JsonPointer) -> Self {
        Operation::Move { from, path }
    }

    pub fn copy(from: JsonPointer, path: JsonPointer) -> Self {
        Operation::Copy { from, path }
    }

    pub fn test(path: JsonPointer, value: impl Into<Value>) -> Self {
        Operation::Test {
            path,
            value: value.into(),
        }
    }

    /// The RFC 6902 `op` name.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
            Operation::Move { .. } => "move",
            Operation::Copy { .. } => "copy",
            Operation::Test { .. } => "test",
        }
    }

    /// The target location.
    pub fn path(&self) -> &JsonPointer {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. }
            | Operation::Test { path, .. } => path,
        }
    }
}

/// An ordered list of operations, stored and applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Vec<Operation>);

impl Patch {
    /// An empty patch.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decodes a raw JSON patch document.
    ///
    /// The input must be an array of operation objects. A malformed element is
    /// reported as a [`PatchApplyError`] pointing at that element, so callers
    /// can reject user input before touching stored state.
    pub fn from_value(value: Value) -> Result<Self, PatchApplyError> {
        let Value::Array(items) = value else {
            return Err(PatchApplyError::new(
                PatchFailure::Malformed("patch must be a JSON array".to_string()),
                0,
            ));
        };

        let mut ops = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let op = serde_json::from_value(item).map_err(|e| {
                PatchApplyError::new(PatchFailure::Malformed(e.to_string()), index)
            })?;
            ops.push(op);
        }
        Ok(Self(ops))
    }

    /// Encodes as a JSON array.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Array(Vec::new()))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.0
    }

    pub fn push(&mut self, op: Operation) {
        self.0.push(op);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }
}

impl From<Vec<Operation>> for Patch {
    fn from(ops: Vec<Operation>) -> Self {
        Self(ops)
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
