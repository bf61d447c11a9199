//! Reference [`NotebookStorage`] backed by hash maps.
//!
//! Besides the trait it has helpers for seeding data, mutating notes and
//! linked notebooks the way a sync engine would, and making the next call
//! of a given kind fail. Every mutation is published to subscribers.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

use super::{NotebookListOrder, NotebookStorage, StorageError, StorageEvent};
use crate::notebook::validation::fold_name;
use crate::notebook::{LinkedNotebook, NotebookRecord};

/// Storage call kinds, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    ListNotebooks,
    ListLinkedNotebooks,
    FindNotebookByName,
    FindLinkedNotebook,
    PutNotebook,
    ExpungeNotebook,
    NoteCount,
}

#[derive(Default)]
struct State {
    notebooks: HashMap<String, NotebookRecord>,
    linked: BTreeMap<String, LinkedNotebook>,
    /// note id -> notebook local id
    notes: HashMap<String, String>,
    subscribers: Vec<UnboundedSender<StorageEvent>>,
    failures: HashMap<StorageOp, usize>,
    calls: HashMap<StorageOp, usize>,
    latency: Option<Duration>,
    next_note: u64,
}

impl State {
    fn publish(&mut self, event: StorageEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Count the call and consume one injected failure, if any.
    fn enter(&mut self, op: StorageOp) -> Result<(), StorageError> {
        *self.calls.entry(op).or_insert(0) += 1;
        if let Some(remaining) = self.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Backend(format!("injected {:?} failure", op)));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> UnboundedReceiver<StorageEvent> {
        let (tx, rx) = unbounded_channel();
        self.state.write().await.subscribers.push(tx);
        rx
    }

    /// Make the next `times` calls of `op` fail.
    pub async fn fail_next(&self, op: StorageOp, times: usize) {
        self.state.write().await.failures.insert(op, times);
    }

    pub async fn call_count(&self, op: StorageOp) -> usize {
        self.state.read().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// Delay applied before every trait call.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Insert without publishing, as if the data had always been there.
    pub async fn seed_notebook(&self, record: NotebookRecord) {
        self.state
            .write()
            .await
            .notebooks
            .insert(record.local_id.clone(), record);
    }

    pub async fn seed_linked_notebook(&self, linked: LinkedNotebook) {
        self.state
            .write()
            .await
            .linked
            .insert(linked.guid.clone(), linked);
    }

    pub async fn notebook(&self, local_id: &str) -> Option<NotebookRecord> {
        self.state.read().await.notebooks.get(local_id).cloned()
    }

    pub async fn notebook_count(&self) -> usize {
        self.state.read().await.notebooks.len()
    }

    /// Put from another writer (a sync engine, another window).
    pub async fn external_put_notebook(&self, record: NotebookRecord) {
        let mut state = self.state.write().await;
        state.notebooks.insert(record.local_id.clone(), record.clone());
        state.publish(StorageEvent::NotebookPut(record));
    }

    pub async fn external_expunge_notebook(&self, local_id: &str) {
        let mut state = self.state.write().await;
        if state.notebooks.remove(local_id).is_some() {
            state.notes.retain(|_, notebook| notebook != local_id);
            state.publish(StorageEvent::NotebookExpunged {
                local_id: local_id.to_string(),
            });
        }
    }

    pub async fn put_linked_notebook(&self, linked: LinkedNotebook) {
        let mut state = self.state.write().await;
        state.linked.insert(linked.guid.clone(), linked.clone());
        state.publish(StorageEvent::LinkedNotebookPut(linked));
    }

    /// Expunge a linked notebook and every notebook of that origin.
    pub async fn expunge_linked_notebook(&self, guid: &str) {
        let mut state = self.state.write().await;
        if state.linked.remove(guid).is_none() {
            return;
        }
        let ids: Vec<String> = state
            .notebooks
            .values()
            .filter(|r| r.linked_guid() == Some(guid))
            .map(|r| r.local_id.clone())
            .collect();
        for id in &ids {
            state.notebooks.remove(id);
            state.notes.retain(|_, notebook| notebook != id);
        }
        state.publish(StorageEvent::LinkedNotebookExpunged {
            guid: guid.to_string(),
        });
    }

    /// Add a note to a notebook; returns the note id.
    pub async fn add_note(&self, notebook_local_id: &str) -> Result<String, StorageError> {
        let mut state = self.state.write().await;
        if !state.notebooks.contains_key(notebook_local_id) {
            return Err(StorageError::NotFound(notebook_local_id.to_string()));
        }
        state.next_note += 1;
        let note_id = format!("note-{}", state.next_note);
        state
            .notes
            .insert(note_id.clone(), notebook_local_id.to_string());
        state.publish(StorageEvent::NotePut {
            note_id: note_id.clone(),
            notebook_local_id: notebook_local_id.to_string(),
        });
        Ok(note_id)
    }

    pub async fn move_note(&self, note_id: &str, new_notebook_local_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.notebooks.contains_key(new_notebook_local_id) {
            return Err(StorageError::NotFound(new_notebook_local_id.to_string()));
        }
        let old = state
            .notes
            .insert(note_id.to_string(), new_notebook_local_id.to_string())
            .ok_or_else(|| StorageError::NotFound(note_id.to_string()))?;
        state.publish(StorageEvent::NoteNotebookChanged {
            note_id: note_id.to_string(),
            old_notebook_local_id: old,
            new_notebook_local_id: new_notebook_local_id.to_string(),
        });
        Ok(())
    }

    pub async fn expunge_note(&self, note_id: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let notebook = state
            .notes
            .remove(note_id)
            .ok_or_else(|| StorageError::NotFound(note_id.to_string()))?;
        state.publish(StorageEvent::NoteExpunged {
            note_id: note_id.to_string(),
            notebook_local_id: notebook,
        });
        Ok(())
    }

    async fn enter(&self, op: StorageOp) -> Result<(), StorageError> {
        let latency = {
            let mut state = self.state.write().await;
            state.enter(op)?;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl NotebookStorage for InMemoryStorage {
    async fn list_notebooks(
        &self,
        offset: usize,
        limit: usize,
        order: NotebookListOrder,
    ) -> Result<Vec<NotebookRecord>, StorageError> {
        self.enter(StorageOp::ListNotebooks).await?;
        let state = self.state.read().await;
        let mut all: Vec<&NotebookRecord> = state.notebooks.values().collect();
        match order {
            NotebookListOrder::ByName => all.sort_by(|a, b| {
                (fold_name(&a.name), &a.local_id).cmp(&(fold_name(&b.name), &b.local_id))
            }),
            NotebookListOrder::ByLocalId => all.sort_by(|a, b| a.local_id.cmp(&b.local_id)),
        }
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn list_linked_notebooks(&self, offset: usize, limit: usize) -> Result<Vec<LinkedNotebook>, StorageError> {
        self.enter(StorageOp::ListLinkedNotebooks).await?;
        let state = self.state.read().await;
        Ok(state.linked.values().skip(offset).take(limit).cloned().collect())
    }

    async fn find_notebook_by_name(
        &self,
        name: &str,
        linked_notebook_guid: Option<&str>,
    ) -> Result<Option<NotebookRecord>, StorageError> {
        self.enter(StorageOp::FindNotebookByName).await?;
        let folded = fold_name(name);
        let state = self.state.read().await;
        Ok(state
            .notebooks
            .values()
            .find(|r| r.linked_guid() == linked_notebook_guid && fold_name(&r.name) == folded)
            .cloned())
    }

    async fn find_linked_notebook(&self, guid: &str) -> Result<Option<LinkedNotebook>, StorageError> {
        self.enter(StorageOp::FindLinkedNotebook).await?;
        Ok(self.state.read().await.linked.get(guid).cloned())
    }

    async fn put_notebook(&self, record: NotebookRecord) -> Result<NotebookRecord, StorageError> {
        self.enter(StorageOp::PutNotebook).await?;
        let mut state = self.state.write().await;
        let folded = fold_name(&record.name);
        let clash = state.notebooks.values().any(|r| {
            r.local_id != record.local_id
                && r.linked_guid() == record.linked_guid()
                && fold_name(&r.name) == folded
        });
        if clash {
            return Err(StorageError::Conflict(format!(
                "notebook named \"{}\" already exists",
                record.name
            )));
        }
        state
            .notebooks
            .insert(record.local_id.clone(), record.clone());
        state.publish(StorageEvent::NotebookPut(record.clone()));
        Ok(record)
    }

    async fn expunge_notebook(&self, local_id: &str) -> Result<(), StorageError> {
        self.enter(StorageOp::ExpungeNotebook).await?;
        let mut state = self.state.write().await;
        if state.notebooks.remove(local_id).is_none() {
            return Err(StorageError::NotFound(local_id.to_string()));
        }
        state.notes.retain(|_, notebook| notebook != local_id);
        state.publish(StorageEvent::NotebookExpunged {
            local_id: local_id.to_string(),
        });
        Ok(())
    }

    async fn note_count_for_notebook(&self, local_id: &str) -> Result<u32, StorageError> {
        self.enter(StorageOp::NoteCount).await?;
        let state = self.state.read().await;
        let count = state.notes.values().filter(|n| *n == local_id).count();
        Ok(count as u32)
    }
}
