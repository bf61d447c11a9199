//! Asynchronous storage the catalog mirrors.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notebook::{LinkedNotebook, NotebookRecord};

pub use memory::{InMemoryStorage, StorageOp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotebookListOrder {
    ByName,
    ByLocalId,
}

/// Change notifications published by storage, whoever made the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    NotebookPut(NotebookRecord),
    NotebookExpunged {
        local_id: String,
    },
    LinkedNotebookPut(LinkedNotebook),
    LinkedNotebookExpunged {
        guid: String,
    },
    NotePut {
        note_id: String,
        notebook_local_id: String,
    },
    NoteNotebookChanged {
        note_id: String,
        old_notebook_local_id: String,
        new_notebook_local_id: String,
    },
    NoteExpunged {
        note_id: String,
        notebook_local_id: String,
    },
}

#[async_trait]
pub trait NotebookStorage: Send + Sync {
    /// One page of notebooks. A page shorter than `limit` is the last one.
    async fn list_notebooks(
        &self,
        offset: usize,
        limit: usize,
        order: NotebookListOrder,
    ) -> Result<Vec<NotebookRecord>, StorageError>;

    async fn list_linked_notebooks(&self, offset: usize, limit: usize) -> Result<Vec<LinkedNotebook>, StorageError>;

    /// Case-insensitive lookup within one linked-notebook scope.
    async fn find_notebook_by_name(
        &self,
        name: &str,
        linked_notebook_guid: Option<&str>,
    ) -> Result<Option<NotebookRecord>, StorageError>;

    async fn find_linked_notebook(&self, guid: &str) -> Result<Option<LinkedNotebook>, StorageError>;

    /// Insert or replace; returns the stored record.
    async fn put_notebook(&self, record: NotebookRecord) -> Result<NotebookRecord, StorageError>;

    async fn expunge_notebook(&self, local_id: &str) -> Result<(), StorageError>;

    async fn note_count_for_notebook(&self, local_id: &str) -> Result<u32, StorageError>;
}
