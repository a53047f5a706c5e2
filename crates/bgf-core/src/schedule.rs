use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use bgf_model::{TaskConfig, TaskId};

/// In-memory book of the task configs the application has scheduled.
///
/// Boot recovery walks it to decide which schedules to re-arm. Persisting it
/// across process restarts is left to the embedder.
#[derive(Clone, Default)]
pub struct ScheduleBook {
    inner: Arc<RwLock<BTreeMap<TaskId, TaskConfig>>>,
}

impl ScheduleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the book, e.g. with configs loaded by the host after a restart.
    pub fn with_configs(configs: impl IntoIterator<Item = TaskConfig>) -> Self {
        let book = Self::new();
        for cfg in configs {
            book.put(cfg);
        }
        book
    }

    pub fn put(&self, config: TaskConfig) -> Option<TaskConfig> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(config.task_id.clone(), config)
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskConfig> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(id).cloned()
    }

    pub fn remove(&self, id: &TaskId) -> Option<TaskConfig> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(id)
    }

    /// All configs, ordered by task id.
    pub fn list(&self) -> Vec<TaskConfig> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.values().cloned().collect()
    }

    pub fn clear(&self) -> Vec<TaskId> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *inner).into_keys().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
