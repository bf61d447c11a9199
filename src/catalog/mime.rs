//! Drag and drop of notebooks between stacks.

use serde::{Deserialize, Serialize};

use crate::catalog::identity::ItemKey;
use crate::catalog::NotebookCatalog;
use crate::error::{CatalogError, Result};
use crate::notebook::NotebookRecord;
use crate::view::ItemId;

pub const NOTEBOOK_MIME_TYPE: &str = "application/x-notebook-catalog-notebook";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookDragPayload {
    pub item_id: ItemId,
    pub local_id: String,
    pub record: NotebookRecord,
}

impl NotebookDragPayload {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CatalogError::Internal(format!("drag payload: {}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CatalogError::Internal(format!("drag payload: {}", e)))
    }
}

/// Where a dropped notebook ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Stack(String),
    NoStack,
}

impl NotebookCatalog {
    /// Payload for dragging a notebook item. Stacks and roots aren't draggable.
    pub fn drag_payload(&self, item: ItemId) -> Result<NotebookDragPayload> {
        let record = self.record_for_item(item).ok_or(CatalogError::ItemNotFound)?;
        if record.is_linked() {
            return Err(CatalogError::FromLinkedNotebook(record.name.clone()));
        }
        Ok(NotebookDragPayload {
            item_id: item,
            local_id: record.local_id.clone(),
            record: record.clone(),
        })
    }

    /// Resolve a drop onto `target`: a stack means "move into it", the
    /// all-notebooks item means "take it out of its stack".
    pub fn drop_target(&self, target: Option<ItemId>) -> Result<DropTarget> {
        let item = target.ok_or(CatalogError::ItemNotFound)?;
        match self.item_key(item).ok_or(CatalogError::ItemNotFound)? {
            ItemKey::AllNotebooksRoot => Ok(DropTarget::NoStack),
            ItemKey::Stack { name, linked_notebook_guid: None } => Ok(DropTarget::Stack(name)),
            ItemKey::Stack { name, linked_notebook_guid: Some(_) } => Err(CatalogError::FromLinkedNotebook(name)),
            ItemKey::LinkedNotebook(guid) => Err(CatalogError::FromLinkedNotebook(guid)),
            ItemKey::Notebook(_) => Err(CatalogError::Internal("can't drop onto a notebook".to_string())),
        }
    }

    /// Encoded drag payload for `item`, to be offered under
    /// [`NOTEBOOK_MIME_TYPE`].
    pub fn mime_payload(&self, item: ItemId) -> Result<Vec<u8>> {
        self.drag_payload(item)?.encode()
    }

    /// Apply a decoded drop. Returns the record to persist, or `None` when
    /// the notebook already sits there.
    pub fn drop_payload(&mut self, bytes: &[u8], target: Option<ItemId>) -> Result<Option<NotebookRecord>> {
        let payload = NotebookDragPayload::decode(bytes)?;
        let destination = self.drop_target(target)?;
        if !self.store.contains(&payload.local_id) {
            return Err(CatalogError::ItemNotFound);
        }
        match destination {
            DropTarget::Stack(stack) => self.set_stack(&payload.local_id, Some(&stack)),
            DropTarget::NoStack => self.set_stack(&payload.local_id, None),
        }
    }
}
