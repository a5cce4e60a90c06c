//! Execution storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use batchrun_core::{BatchError, BatchResult, ExecutionId, ExecutionSerializer, ExecutionTree};

/// Execution store abstraction.
pub trait ExecutionStore: Send + Sync {
    /// Persist a whole tree under its root id, replacing any previous version.
    fn store(&self, tree: &ExecutionTree) -> BatchResult<()>;

    /// Load the tree stored under `id`.
    fn retrieve(&self, id: &ExecutionId) -> BatchResult<ExecutionTree>;

    /// Whether a tree is stored under the root id `id`.
    fn contains(&self, id: &ExecutionId) -> bool;

    /// List the stored root ids, sorted.
    fn ids(&self) -> Vec<ExecutionId>;
}

impl<S: ExecutionStore + ?Sized> ExecutionStore for Arc<S> {
    fn store(&self, tree: &ExecutionTree) -> BatchResult<()> {
        (**self).store(tree)
    }

    fn retrieve(&self, id: &ExecutionId) -> BatchResult<ExecutionTree> {
        (**self).retrieve(id)
    }

    fn contains(&self, id: &ExecutionId) -> bool {
        (**self).contains(id)
    }

    fn ids(&self) -> Vec<ExecutionId> {
        (**self).ids()
    }
}

/// In-memory execution store for tests/dev.
///
/// Trees are kept as serialized documents, so every round trip goes through
/// the same encoding a persistent backend would see.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    documents: RwLock<HashMap<ExecutionId, String>>,
    serializer: ExecutionSerializer,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Raw stored document, mainly for inspection in tests.
    pub fn document(&self, id: &ExecutionId) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn store(&self, tree: &ExecutionTree) -> BatchResult<()> {
        let text = self.serializer.serialize(tree)?;
        let id = tree.id().clone();
        debug!(execution_id = %id, nodes = tree.len(), "storing execution tree");
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, text);
        Ok(())
    }

    fn retrieve(&self, id: &ExecutionId) -> BatchResult<ExecutionTree> {
        let text = self
            .document(id)
            .ok_or_else(|| BatchError::not_found(format!("execution not found: {id}")))?;
        self.serializer.deserialize(&text)
    }

    fn contains(&self, id: &ExecutionId) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    fn ids(&self) -> Vec<ExecutionId> {
        let mut ids: Vec<_> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
