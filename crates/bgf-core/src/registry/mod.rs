use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use bgf_model::TaskId;

use crate::task::BgTask;

/// Process-wide map from task id to the live descriptor.
///
/// Replace-on-conflict: registering a descriptor for an id that is still in flight
/// supersedes the previous one (last writer wins). All operations go through one
/// lock, so callback threads see a consistent view per id.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<TaskId, Arc<BgTask>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by task id; returns the superseded descriptor.
    pub fn register(&self, task: Arc<BgTask>) -> Option<Arc<BgTask>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(task.task_id().clone(), task)
    }

    pub fn lookup(&self, id: &TaskId) -> Option<Arc<BgTask>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(id).cloned()
    }

    /// Flag the live descriptor as timed out; returns whether one existed.
    pub fn mark_timed_out(&self, id: &TaskId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.get(id) {
            Some(task) => {
                task.mark_timed_out();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &TaskId) -> Option<Arc<BgTask>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(id)
    }

    /// Remove `task` only if it is still the live descriptor for its id.
    ///
    /// A superseded descriptor never evicts its successor.
    pub fn remove_if_current(&self, task: &Arc<BgTask>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.get(task.task_id()) {
            Some(live) if Arc::ptr_eq(live, task) => {
                inner.remove(task.task_id());
                true
            }
            _ => false,
        }
    }

    pub fn is_current(&self, task: &Arc<BgTask>) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .get(task.task_id())
            .is_some_and(|live| Arc::ptr_eq(live, task))
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
