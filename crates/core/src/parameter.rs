//! Named parameter lookup against an execution.

use core::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{BatchError, BatchResult};
use crate::execution::{ExecutionTree, NodeId};

/// Resolves a value from an execution's context.
pub trait ParameterAccessor {
    type Value;

    fn get(&self, tree: &ExecutionTree, node: NodeId) -> BatchResult<Self::Value>;
}

/// Raw JSON parameter, looked up on the execution itself or on its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    from_root: bool,
}

impl Parameter {
    /// Read from the execution's own parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from_root: false,
        }
    }

    /// Read from the root execution's parameters (shared by every sub-job).
    pub fn from_root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from_root: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup<'t>(&self, tree: &'t ExecutionTree, node: NodeId) -> BatchResult<&'t JsonValue> {
        let target = if self.from_root { tree.root_of(node) } else { node };
        let exec = tree.get(target).ok_or_else(|| {
            BatchError::parameter_access(format!(
                "parameter `{}`: execution node {} is not part of this tree",
                self.name,
                target.index()
            ))
        })?;
        exec.parameter(&self.name).ok_or_else(|| {
            BatchError::parameter_access(format!(
                "parameter `{}` is not defined on execution {}",
                self.name,
                exec.id()
            ))
        })
    }
}

impl ParameterAccessor for Parameter {
    type Value = JsonValue;

    fn get(&self, tree: &ExecutionTree, node: NodeId) -> BatchResult<JsonValue> {
        self.lookup(tree, node).cloned()
    }
}

/// Parameter deserialized into `T`.
#[derive(Debug, Clone)]
pub struct TypedParameter<T> {
    inner: Parameter,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedParameter<T> {
    pub fn new(inner: Parameter) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ParameterAccessor for TypedParameter<T> {
    type Value = T;

    fn get(&self, tree: &ExecutionTree, node: NodeId) -> BatchResult<T> {
        let raw = self.inner.lookup(tree, node)?;
        T::deserialize(raw).map_err(|e| {
            BatchError::type_mismatch(format!(
                "parameter `{}` has an unexpected shape",
                self.inner.name
            ))
            .with_source(e)
        })
    }
}
