//! Keeps a [`NotebookCatalog`] in step with asynchronous storage.
//!
//! Storage calls run as spawned tokio tasks. Their results come back on a
//! channel as `(OperationId, Completion)` and are applied on the owner of the
//! model through [`NotebookModel::process_completions`],
//! [`NotebookModel::next_completion`] or [`NotebookModel::run_until_idle`].
//! Local edits are applied to the tree right away; a failed write is
//! reported on the error channel and only a failed create is rolled back.

pub mod requests;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::cache::RecordCache;
use crate::catalog::identity::ItemKey;
use crate::catalog::sorting::SortChange;
use crate::catalog::NotebookCatalog;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::notebook::{LinkedNotebook, NotebookRecord};
use crate::storage::{NotebookListOrder, NotebookStorage, StorageError, StorageEvent};
use crate::view::{CellValue, Column, ItemId, ModelObserver, SortOrder};

pub use requests::{OperationId, PendingRequest, RequestTracker};

/// Result of one storage call.
#[derive(Debug)]
pub enum Completion {
    NotebooksListed(std::result::Result<Vec<NotebookRecord>, StorageError>),
    LinkedNotebooksListed(std::result::Result<Vec<LinkedNotebook>, StorageError>),
    LinkedNotebookFound(std::result::Result<Option<LinkedNotebook>, StorageError>),
    NameVerified(std::result::Result<Option<NotebookRecord>, StorageError>),
    NotebookPut(std::result::Result<NotebookRecord, StorageError>),
    NotebookExpunged(std::result::Result<(), StorageError>),
    NoteCounted(std::result::Result<u32, StorageError>),
}

pub struct NotebookModel {
    catalog: NotebookCatalog,
    storage: Arc<dyn NotebookStorage>,
    config: CatalogConfig,
    cache: RecordCache,
    requests: RequestTracker,
    completions_tx: UnboundedSender<(OperationId, Completion)>,
    completions_rx: UnboundedReceiver<(OperationId, Completion)>,
    errors: UnboundedSender<CatalogError>,
    events: Option<UnboundedReceiver<StorageEvent>>,
    started: bool,
    notebooks_drained: bool,
    linked_drained: bool,
    fully_listed: bool,
    linked_lookups: HashSet<String>,
    pending_creates: HashSet<String>,
    counting: HashSet<String>,
    /// Counts that changed while a count request was in flight.
    stale_counts: HashSet<String>,
}

impl NotebookModel {
    /// Build a model over `storage`. The receiver gets every asynchronous
    /// failure, once per failed operation.
    pub fn new(
        storage: Arc<dyn NotebookStorage>,
        config: CatalogConfig,
        observer: Box<dyn ModelObserver>,
    ) -> (Self, UnboundedReceiver<CatalogError>) {
        let (completions_tx, completions_rx) = unbounded_channel();
        let (errors, errors_rx) = unbounded_channel();
        let catalog = NotebookCatalog::new(observer).with_label(&config.all_notebooks_label);
        let cache = RecordCache::new(config.record_cache_capacity);
        let model = Self {
            catalog,
            storage,
            config,
            cache,
            requests: RequestTracker::new(),
            completions_tx,
            completions_rx,
            errors,
            events: None,
            started: false,
            notebooks_drained: false,
            linked_drained: false,
            fully_listed: false,
            linked_lookups: HashSet::new(),
            pending_creates: HashSet::new(),
            counting: HashSet::new(),
            stale_counts: HashSet::new(),
        };
        (model, errors_rx)
    }

    /// Take storage notifications from `events`; they are applied along with
    /// completions.
    pub fn listen(&mut self, events: UnboundedReceiver<StorageEvent>) {
        self.events = Some(events);
    }

    pub fn catalog(&self) -> &NotebookCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Shared handle to the record cache.
    pub fn cache(&self) -> RecordCache {
        self.cache.clone()
    }

    pub fn is_fully_listed(&self) -> bool {
        self.fully_listed
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn outstanding_linked_lookups(&self) -> usize {
        self.linked_lookups.len()
    }

    pub fn is_pending_create(&self, local_id: &str) -> bool {
        self.pending_creates.contains(local_id)
    }

    fn report(&self, err: CatalogError) {
        match err.kind() {
            crate::error::ErrorKind::Internal => log::error!("[NotebookModel] {}", err),
            _ => log::warn!("[NotebookModel] {}", err),
        }
        let _ = self.errors.send(err);
    }

    fn dispatch<F>(&mut self, request: PendingRequest, call: F) -> OperationId
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let id = self.requests.issue(request);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let completion = call.await;
            let _ = tx.send((id, completion));
        });
        id
    }

    // ------------------------------------------------------------------
    // Initial load
    // ------------------------------------------------------------------

    /// Start paging through notebooks and linked notebooks. Calling it again
    /// does nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        log::info!("[NotebookModel] Starting initial load");
        self.request_notebook_page(0);
        self.request_linked_page(0);
    }

    fn request_notebook_page(&mut self, offset: usize) {
        let limit = self.config.list_page_size;
        let storage = Arc::clone(&self.storage);
        self.dispatch(PendingRequest::ListNotebooks { offset, limit }, async move {
            Completion::NotebooksListed(storage.list_notebooks(offset, limit, NotebookListOrder::ByName).await)
        });
    }

    fn request_linked_page(&mut self, offset: usize) {
        let limit = self.config.linked_list_page_size;
        let storage = Arc::clone(&self.storage);
        self.dispatch(PendingRequest::ListLinkedNotebooks { offset, limit }, async move {
            Completion::LinkedNotebooksListed(storage.list_linked_notebooks(offset, limit).await)
        });
    }

    fn request_linked_lookup(&mut self, guid: &str) {
        if !self.linked_lookups.insert(guid.to_string()) {
            return;
        }
        let storage = Arc::clone(&self.storage);
        let owned = guid.to_string();
        self.dispatch(
            PendingRequest::FindLinkedNotebook {
                guid: guid.to_string(),
            },
            async move { Completion::LinkedNotebookFound(storage.find_linked_notebook(&owned).await) },
        );
    }

    fn check_fully_listed(&mut self) {
        if self.fully_listed || !self.notebooks_drained || !self.linked_drained || !self.linked_lookups.is_empty() {
            return;
        }
        self.fully_listed = true;
        log::info!("[NotebookModel] All notebooks listed ({} total)", self.catalog.len());
        self.catalog.observer_mut().all_notebooks_listed();
    }

    /// Same path for listed pages and put notifications.
    fn merge_notebook(&mut self, record: NotebookRecord) {
        if let Some(guid) = record.linked_guid() {
            if self.catalog.linked_notebook_username(guid).is_none() {
                let guid = guid.to_string();
                self.request_linked_lookup(&guid);
            }
        }
        self.cache.insert(record.clone());
        let local_id = record.local_id.clone();
        self.catalog.upsert_notebook(record);
        self.schedule_note_count(&local_id);
    }

    // ------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------

    fn notebook_id_of(&self, item: ItemId) -> Result<String> {
        match self.catalog.item_key(item) {
            Some(ItemKey::Notebook(local_id)) => Ok(local_id),
            Some(_) => Err(CatalogError::Internal(format!("item {:?} is not a notebook", item))),
            None => Err(CatalogError::ItemNotFound),
        }
    }

    fn dispatch_put(&mut self, record: NotebookRecord, create: bool) {
        let local_id = record.local_id.clone();
        self.cache.invalidate(&local_id);
        let request = if create {
            PendingRequest::CreateNotebook { local_id }
        } else {
            PendingRequest::UpdateNotebook { local_id }
        };
        let storage = Arc::clone(&self.storage);
        self.dispatch(request, async move { Completion::NotebookPut(storage.put_notebook(record).await) });
    }

    fn put_all(&mut self, records: Vec<NotebookRecord>) {
        for record in records {
            self.dispatch_put(record, false);
        }
    }

    /// Create a notebook locally and persist it. The item shows up at once.
    pub fn create_notebook(&mut self, name: &str, stack: Option<&str>) -> Result<ItemId> {
        let stack = stack.filter(|s| !s.is_empty());
        self.catalog.validate_new_notebook(name, stack)?;
        let mut record = NotebookRecord::new_local(name, stack);
        record.flags.synchronizable = self.config.new_notebooks_synchronizable;
        let local_id = record.local_id.clone();
        let item = self.catalog.upsert_notebook(record.clone());
        self.pending_creates.insert(local_id.clone());
        log::debug!("[NotebookModel] Creating notebook '{}' ({})", name, local_id);

        if self.fully_listed {
            self.dispatch_put(record, true);
        } else {
            // Storage may hold a clashing name the listing hasn't delivered yet.
            let storage = Arc::clone(&self.storage);
            let owned = name.to_string();
            self.dispatch(
                PendingRequest::VerifyName {
                    local_id,
                    name: name.to_string(),
                },
                async move { Completion::NameVerified(storage.find_notebook_by_name(&owned, None).await) },
            );
        }
        Ok(item)
    }

    fn roll_back_create(&mut self, local_id: &str, err: CatalogError) {
        self.pending_creates.remove(local_id);
        self.cache.invalidate(local_id);
        if self.catalog.remove_notebook(local_id).is_some() {
            log::warn!("[NotebookModel] Rolled back create of {}", local_id);
        }
        self.report(err);
    }

    pub fn rename_notebook(&mut self, item: ItemId, new_name: &str) -> Result<()> {
        let local_id = self.notebook_id_of(item)?;
        if let Some(record) = self.catalog.rename_notebook(&local_id, new_name)? {
            self.dispatch_put(record, false);
        }
        Ok(())
    }

    /// Edit one cell. Names of notebooks and stacks plus the four
    /// user-settable flags are editable.
    pub fn set_data(&mut self, item: ItemId, column: Column, value: CellValue) -> Result<()> {
        match (self.catalog.item_key(item), column, value) {
            (None, ..) => Err(CatalogError::ItemNotFound),
            (Some(ItemKey::Stack { name, linked_notebook_guid: None }), Column::Name, CellValue::Text(new)) => {
                self.rename_stack(&name, &new)
            }
            (Some(ItemKey::Stack { name, linked_notebook_guid: Some(_) }), ..) => {
                Err(CatalogError::FromLinkedNotebook(name))
            }
            (Some(ItemKey::Notebook(_)), Column::Name, CellValue::Text(new)) => self.rename_notebook(item, &new),
            (Some(ItemKey::Notebook(local_id)), column, CellValue::Bool(flag))
                if matches!(
                    column,
                    Column::Synchronizable | Column::Default | Column::LastUsed | Column::Favorited
                ) =>
            {
                let changed = self.catalog.set_flag(&local_id, column, flag)?;
                self.put_all(changed);
                Ok(())
            }
            (_, column, _) => Err(CatalogError::NotEditable(column)),
        }
    }

    pub fn move_to_stack(&mut self, item: ItemId, stack: &str) -> Result<()> {
        let local_id = self.notebook_id_of(item)?;
        if let Some(record) = self.catalog.set_stack(&local_id, Some(stack))? {
            self.dispatch_put(record, false);
        }
        Ok(())
    }

    pub fn remove_from_stack(&mut self, item: ItemId) -> Result<()> {
        let local_id = self.notebook_id_of(item)?;
        if let Some(record) = self.catalog.set_stack(&local_id, None)? {
            self.dispatch_put(record, false);
        }
        Ok(())
    }

    pub fn rename_stack(&mut self, old: &str, new: &str) -> Result<()> {
        let changed = self.catalog.rename_stack(old, new)?;
        self.put_all(changed);
        Ok(())
    }

    fn set_flag(&mut self, item: ItemId, column: Column, value: bool) -> Result<()> {
        let local_id = self.notebook_id_of(item)?;
        let changed = self.catalog.set_flag(&local_id, column, value)?;
        self.put_all(changed);
        Ok(())
    }

    pub fn set_default(&mut self, item: ItemId) -> Result<()> {
        self.set_flag(item, Column::Default, true)
    }

    pub fn set_last_used(&mut self, item: ItemId) -> Result<()> {
        self.set_flag(item, Column::LastUsed, true)
    }

    pub fn set_favorited(&mut self, item: ItemId, favorited: bool) -> Result<()> {
        self.set_flag(item, Column::Favorited, favorited)
    }

    pub fn set_synchronizable(&mut self, item: ItemId, synchronizable: bool) -> Result<()> {
        self.set_flag(item, Column::Synchronizable, synchronizable)
    }

    /// Remove a notebook, or dissolve a stack. Synchronized and linked
    /// notebooks are refused before anything changes.
    pub fn remove_notebook(&mut self, item: ItemId) -> Result<()> {
        match self.catalog.item_key(item).ok_or(CatalogError::ItemNotFound)? {
            ItemKey::Notebook(local_id) => {
                self.catalog.check_removable(&local_id)?;
                self.catalog.remove_notebook(&local_id);
                self.cache.invalidate(&local_id);
                self.pending_creates.remove(&local_id);
                let storage = Arc::clone(&self.storage);
                let owned = local_id.clone();
                self.dispatch(PendingRequest::ExpungeNotebook { local_id }, async move {
                    Completion::NotebookExpunged(storage.expunge_notebook(&owned).await)
                });
                Ok(())
            }
            ItemKey::Stack { name, linked_notebook_guid: None } => {
                let changed = self.catalog.dissolve_stack(&name)?;
                self.put_all(changed);
                Ok(())
            }
            ItemKey::Stack { name, .. } => Err(CatalogError::FromLinkedNotebook(name)),
            ItemKey::LinkedNotebook(guid) => Err(CatalogError::FromLinkedNotebook(guid)),
            ItemKey::AllNotebooksRoot => Err(CatalogError::Restricted(
                self.config.all_notebooks_label.clone(),
                "the root item can't be removed".to_string(),
            )),
        }
    }

    /// Drop a dragged notebook onto `target`.
    pub fn drop_mime_data(&mut self, bytes: &[u8], target: Option<ItemId>) -> Result<()> {
        if let Some(record) = self.catalog.drop_payload(bytes, target)? {
            self.dispatch_put(record, false);
        }
        Ok(())
    }

    pub fn mime_data(&self, item: ItemId) -> Result<Vec<u8>> {
        self.catalog.mime_payload(item)
    }

    pub fn sort(&mut self, column: Column, order: SortOrder) -> SortChange {
        self.catalog.sort(column, order)
    }

    // ------------------------------------------------------------------
    // Storage notifications
    // ------------------------------------------------------------------

    pub fn apply_storage_event(&mut self, event: StorageEvent) {
        log::debug!("[NotebookModel] Storage event: {:?}", event);
        match event {
            StorageEvent::NotebookPut(record) => self.merge_notebook(record),
            StorageEvent::NotebookExpunged { local_id } => {
                self.cache.invalidate(&local_id);
                self.pending_creates.remove(&local_id);
                if self.catalog.remove_notebook(&local_id).is_none() {
                    log::debug!("[NotebookModel] Expunged notebook {} was not in the model", local_id);
                }
            }
            StorageEvent::LinkedNotebookPut(linked) => {
                self.catalog.upsert_linked_notebook(&linked);
            }
            StorageEvent::LinkedNotebookExpunged { guid } => {
                for record in self.catalog.remove_linked_notebook(&guid) {
                    self.cache.invalidate(&record.local_id);
                }
            }
            StorageEvent::NotePut { notebook_local_id, .. }
            | StorageEvent::NoteExpunged { notebook_local_id, .. } => {
                self.schedule_note_count(&notebook_local_id);
            }
            StorageEvent::NoteNotebookChanged {
                old_notebook_local_id,
                new_notebook_local_id,
                ..
            } => {
                self.schedule_note_count(&old_notebook_local_id);
                self.schedule_note_count(&new_notebook_local_id);
            }
        }
    }

    fn schedule_note_count(&mut self, local_id: &str) {
        if !self.config.track_note_counts || self.catalog.record(local_id).is_none() {
            return;
        }
        if self.counting.contains(local_id) {
            self.stale_counts.insert(local_id.to_string());
            return;
        }
        self.counting.insert(local_id.to_string());
        let storage = Arc::clone(&self.storage);
        let owned = local_id.to_string();
        self.dispatch(
            PendingRequest::NoteCount {
                local_id: local_id.to_string(),
            },
            async move { Completion::NoteCounted(storage.note_count_for_notebook(&owned).await) },
        );
    }

    // ------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------

    fn drain_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
        }
        let count = pending.len();
        for event in pending {
            self.apply_storage_event(event);
        }
        count
    }

    /// Apply whatever has arrived without waiting. Returns how many
    /// completions and notifications were handled.
    pub fn process_completions(&mut self) -> usize {
        let mut handled = self.drain_events();
        while let Ok((id, completion)) = self.completions_rx.try_recv() {
            self.handle_completion(id, completion);
            handled += 1;
        }
        handled + self.drain_events()
    }

    /// Wait for one completion and apply it. Returns `false` when nothing is
    /// in flight.
    pub async fn next_completion(&mut self) -> bool {
        if self.requests.is_empty() {
            return self.drain_events() > 0;
        }
        match self.completions_rx.recv().await {
            Some((id, completion)) => {
                self.handle_completion(id, completion);
                self.drain_events();
                true
            }
            None => false,
        }
    }

    /// Apply completions and notifications until no request is in flight.
    pub async fn run_until_idle(&mut self) {
        loop {
            self.drain_events();
            if self.requests.is_empty() {
                break;
            }
            self.next_completion().await;
        }
    }

    fn handle_completion(&mut self, id: OperationId, completion: Completion) {
        let Some(request) = self.requests.complete(id) else {
            log::warn!("[NotebookModel] Dropping completion for unknown operation {}", id);
            return;
        };
        let operation = request.label();
        match (request, completion) {
            (PendingRequest::ListNotebooks { offset, limit }, Completion::NotebooksListed(result)) => match result {
                Ok(page) => {
                    let received = page.len();
                    log::debug!("[NotebookModel] Listed {} notebooks at offset {}", received, offset);
                    for record in page {
                        self.merge_notebook(record);
                    }
                    if received < limit {
                        self.notebooks_drained = true;
                        self.check_fully_listed();
                    } else {
                        self.request_notebook_page(offset + received);
                    }
                }
                Err(e) => self.report(CatalogError::storage(operation, e)),
            },
            (PendingRequest::ListLinkedNotebooks { offset, limit }, Completion::LinkedNotebooksListed(result)) => {
                match result {
                    Ok(page) => {
                        let received = page.len();
                        for linked in &page {
                            self.catalog.upsert_linked_notebook(linked);
                        }
                        if received < limit {
                            self.linked_drained = true;
                            self.check_fully_listed();
                        } else {
                            self.request_linked_page(offset + received);
                        }
                    }
                    Err(e) => self.report(CatalogError::storage(operation, e)),
                }
            }
            (PendingRequest::FindLinkedNotebook { guid }, Completion::LinkedNotebookFound(result)) => {
                self.linked_lookups.remove(&guid);
                match result {
                    Ok(Some(linked)) => {
                        self.catalog.upsert_linked_notebook(&linked);
                    }
                    Ok(None) => log::warn!("[NotebookModel] Linked notebook {} not found in storage", guid),
                    Err(e) => self.report(CatalogError::storage(operation, e)),
                }
                self.check_fully_listed();
            }
            (PendingRequest::VerifyName { local_id, name }, Completion::NameVerified(result)) => match result {
                Ok(Some(existing)) if existing.local_id != local_id => {
                    self.roll_back_create(&local_id, CatalogError::DuplicateName(name));
                }
                Ok(_) => match self.catalog.record(&local_id).cloned() {
                    Some(record) => self.dispatch_put(record, true),
                    None => {
                        log::debug!("[NotebookModel] {} removed before its create was sent", local_id);
                        self.pending_creates.remove(&local_id);
                    }
                },
                Err(e) => self.roll_back_create(&local_id, CatalogError::storage(operation, e)),
            },
            (PendingRequest::CreateNotebook { local_id }, Completion::NotebookPut(result)) => match result {
                Ok(stored) => {
                    self.pending_creates.remove(&local_id);
                    self.cache.insert(stored);
                }
                Err(e) => self.roll_back_create(&local_id, CatalogError::storage(operation, e)),
            },
            (PendingRequest::UpdateNotebook { .. }, Completion::NotebookPut(result)) => match result {
                Ok(stored) => self.cache.insert(stored),
                Err(e) => self.report(CatalogError::storage(operation, e)),
            },
            (PendingRequest::ExpungeNotebook { .. }, Completion::NotebookExpunged(result)) => {
                if let Err(e) = result {
                    self.report(CatalogError::storage(operation, e));
                }
            }
            (PendingRequest::NoteCount { local_id }, Completion::NoteCounted(result)) => {
                self.counting.remove(&local_id);
                match result {
                    Ok(count) => {
                        self.catalog.set_note_count(&local_id, count);
                    }
                    Err(e) => self.report(CatalogError::storage(operation, e)),
                }
                if self.stale_counts.remove(&local_id) {
                    self.schedule_note_count(&local_id);
                }
            }
            (request, completion) => {
                self.report(CatalogError::Internal(format!(
                    "completion {:?} does not match request {:?}",
                    completion, request
                )));
            }
        }
    }
}
