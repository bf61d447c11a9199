use moka::sync::Cache;

use crate::notebook::NotebookRecord;

/// Bounded cache of hydrated notebook records, keyed by local id.
///
/// Cloning shares the underlying cache, so other components (a note editor,
/// a sidebar) can read what the catalog has already fetched.
#[derive(Clone)]
pub struct RecordCache {
    inner: Cache<String, NotebookRecord>,
}

impl RecordCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn get(&self, local_id: &str) -> Option<NotebookRecord> {
        self.inner.get(local_id)
    }

    pub fn insert(&self, record: NotebookRecord) {
        self.inner.insert(record.local_id.clone(), record);
    }

    /// Drop a stale entry, e.g. right before a put is dispatched.
    pub fn invalidate(&self, local_id: &str) {
        self.inner.invalidate(local_id);
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
