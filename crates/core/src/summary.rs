//! Per-execution metric aggregation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{BatchError, BatchResult};

/// Ordered key/value facts about one execution (counters, arbitrary results).
///
/// Iteration order is the order in which each key was first set. A `Summary` has
/// no identity of its own; it lives inside a [`JobExecution`](crate::JobExecution),
/// which only lets it be mutated while the execution is running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary {
    entries: Map<String, JsonValue>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, overwriting any previous value (position is kept).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Add `delta` to a numeric entry; an absent key counts as zero.
    pub fn increment(&mut self, key: &str, delta: i64) -> BatchResult<i64> {
        let current = match self.entries.get(key) {
            None => 0,
            Some(JsonValue::Number(n)) => n.as_i64().ok_or_else(|| {
                BatchError::type_mismatch(format!("summary entry `{key}` is not an integer: {n}"))
            })?,
            Some(other) => {
                return Err(BatchError::type_mismatch(format!(
                    "summary entry `{key}` is not numeric: {other}"
                )));
            }
        };

        let next = current.checked_add(delta).ok_or_else(|| {
            BatchError::type_mismatch(format!("summary entry `{key}` overflowed"))
        })?;
        self.entries
            .insert(key.to_string(), JsonValue::Number(Number::from(next)));
        Ok(next)
    }

    /// Push `value` onto an array entry, creating the array if absent.
    pub fn append(&mut self, key: &str, value: impl Into<JsonValue>) -> BatchResult<()> {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        match slot {
            JsonValue::Array(items) => {
                items.push(value.into());
                Ok(())
            }
            other => Err(BatchError::type_mismatch(format!(
                "summary entry `{key}` is not a list: {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Integer view of a counter; absent or non-integer entries read as `None`.
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(JsonValue::as_i64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.entries
    }
}

impl From<Map<String, JsonValue>> for Summary {
    fn from(entries: Map<String, JsonValue>) -> Self {
        Self { entries }
    }
}
