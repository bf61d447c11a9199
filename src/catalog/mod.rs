//! In-memory notebook tree.
//!
//! ```text
//! (invisible root)
//! └── All notebooks
//!     ├── Stack "Projects"
//!     │   └── Notebook "Draft"
//!     ├── Notebook "Work"
//!     └── Linked notebook root (username)
//!         ├── Stack ...
//!         └── Notebook ...
//! ```
//!
//! Records live in the [`EntityStore`]; tree leaves refer to them by local
//! id. Every structural change goes through [`NotebookCatalog::attach`] and
//! [`NotebookCatalog::detach`], which bracket the change for the observer.

pub mod identity;
pub mod mime;
pub mod sorting;
pub mod stacks;
pub mod store;
pub mod tree;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{CatalogError, Result};
use crate::notebook::validation::{fold_name, validate_notebook_name, validate_stack_name};
use crate::notebook::{LinkedNotebook, NotebookFilter, NotebookRecord};
use crate::view::{CellValue, Column, ItemFlags, ItemId, ModelObserver, NoopObserver, Role, SortOrder, TreeAccessor};

use identity::{IdentityRegistry, ItemKey, ALL_NOTEBOOKS_ROOT_ID};
use sorting::{SortChange, SortKey, SortingPolicy};
use store::EntityStore;
use tree::{NodeId, NodeKind, Tree};

pub const DEFAULT_ALL_NOTEBOOKS_LABEL: &str = "All notebooks";

/// Serializable dump of the tree, mainly for tests and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub item: Option<ItemId>,
    pub label: String,
    pub children: Vec<CatalogSnapshot>,
}

pub struct NotebookCatalog {
    store: EntityStore,
    registry: IdentityRegistry,
    tree: Tree,
    sorting: SortingPolicy,
    observer: Box<dyn ModelObserver>,
    all_notebooks_root: Option<NodeId>,
    notebook_nodes: HashMap<String, NodeId>,
    stack_nodes: HashMap<(String, Option<String>), NodeId>,
    linked_roots: HashMap<String, NodeId>,
    all_notebooks_label: String,
}

impl Default for NotebookCatalog {
    fn default() -> Self {
        Self::new(Box::new(NoopObserver))
    }
}

impl NotebookCatalog {
    pub fn new(observer: Box<dyn ModelObserver>) -> Self {
        Self {
            store: EntityStore::new(),
            registry: IdentityRegistry::new(),
            tree: Tree::new(),
            sorting: SortingPolicy::default(),
            observer,
            all_notebooks_root: None,
            notebook_nodes: HashMap::new(),
            stack_nodes: HashMap::new(),
            linked_roots: HashMap::new(),
            all_notebooks_label: DEFAULT_ALL_NOTEBOOKS_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.all_notebooks_label = label.to_string();
        self
    }

    pub fn set_observer(&mut self, observer: Box<dyn ModelObserver>) {
        self.observer = observer;
    }

    pub(crate) fn observer_mut(&mut self) -> &mut dyn ModelObserver {
        self.observer.as_mut()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sorting.order()
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    fn handle_of(&self, node: NodeId) -> Option<ItemId> {
        let key = self.tree.kind(node)?.item_key()?;
        self.registry.lookup(&key)
    }

    /// Handle of `node` as a parent: `None` for the invisible root.
    fn parent_handle_of(&self, node: NodeId) -> Option<ItemId> {
        if node == self.tree.invisible_root() {
            None
        } else {
            self.handle_of(node)
        }
    }

    fn node_of(&self, item: ItemId) -> Option<NodeId> {
        match self.registry.resolve(item)? {
            ItemKey::AllNotebooksRoot => self.all_notebooks_root,
            ItemKey::Notebook(id) => self.notebook_nodes.get(&id).copied(),
            ItemKey::Stack { name, linked_notebook_guid } => {
                self.stack_nodes.get(&(name, linked_notebook_guid)).copied()
            }
            ItemKey::LinkedNotebook(guid) => self.linked_roots.get(&guid).copied(),
        }
    }

    fn parent_node_of(&self, parent: Option<ItemId>) -> Option<NodeId> {
        match parent {
            None => Some(self.tree.invisible_root()),
            Some(item) => self.node_of(item),
        }
    }

    pub fn item_key(&self, item: ItemId) -> Option<ItemKey> {
        self.node_of(item)?;
        self.registry.resolve(item)
    }

    pub fn item_for_notebook(&self, local_id: &str) -> Option<ItemId> {
        self.notebook_nodes.get(local_id).and_then(|n| self.handle_of(*n))
    }

    pub fn item_for_name(&self, name: &str, linked_notebook_guid: Option<&str>) -> Option<ItemId> {
        let record = self.store.find_by_name(name, linked_notebook_guid)?;
        self.item_for_notebook(&record.local_id)
    }

    pub fn item_for_stack(&self, stack: &str, linked_notebook_guid: Option<&str>) -> Option<ItemId> {
        let key = (stack.to_string(), linked_notebook_guid.map(str::to_string));
        self.stack_nodes.get(&key).and_then(|n| self.handle_of(*n))
    }

    pub fn item_for_linked_notebook(&self, guid: &str) -> Option<ItemId> {
        self.linked_roots.get(guid).and_then(|n| self.handle_of(*n))
    }

    pub fn all_notebooks_item(&self) -> Option<ItemId> {
        self.all_notebooks_root.map(|_| ALL_NOTEBOOKS_ROOT_ID)
    }

    pub fn record(&self, local_id: &str) -> Option<&NotebookRecord> {
        self.store.get(local_id)
    }

    pub fn record_for_item(&self, item: ItemId) -> Option<&NotebookRecord> {
        match self.item_key(item)? {
            ItemKey::Notebook(id) => self.store.get(&id),
            _ => None,
        }
    }

    pub fn default_notebook_item(&self) -> Option<ItemId> {
        let record = self.store.iter_by_name().find(|r| r.flags.default)?;
        self.item_for_notebook(&record.local_id)
    }

    pub fn last_used_notebook_item(&self) -> Option<ItemId> {
        let record = self.store.iter_by_name().find(|r| r.flags.last_used)?;
        self.item_for_notebook(&record.local_id)
    }

    pub fn stacks(&self, linked_notebook_guid: Option<&str>) -> Vec<String> {
        self.store.stacks(linked_notebook_guid)
    }

    pub fn notebook_names(&self, filter: &NotebookFilter) -> Vec<String> {
        self.store
            .iter_by_name()
            .filter(|r| filter.matches(r))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Username of a linked notebook, if it has been resolved.
    pub fn linked_notebook_username(&self, guid: &str) -> Option<&str> {
        let node = self.linked_roots.get(guid)?;
        match self.tree.kind(*node)? {
            NodeKind::LinkedNotebookRoot { username, .. } if !username.is_empty() => Some(username),
            _ => None,
        }
    }

    pub fn children_of(&self, parent: Option<ItemId>) -> Vec<ItemId> {
        self.parent_node_of(parent)
            .map(|node| {
                self.tree
                    .children(node)
                    .iter()
                    .filter_map(|child| self.handle_of(*child))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Structural primitives
    // ------------------------------------------------------------------

    fn sort_key(&self, node: NodeId) -> SortKey {
        match self.tree.kind(node) {
            Some(kind) => SortKey::for_node(kind, &self.store),
            None => SortKey::for_node(&NodeKind::InvisibleRoot, &self.store),
        }
    }

    fn sorted_row(&self, parent: NodeId, node: NodeId) -> usize {
        let candidate = self.sort_key(node);
        self.sorting
            .insertion_row(self.tree.children(parent), &candidate, |id| self.sort_key(id))
    }

    /// Insert a detached node under `parent` at its sorted row.
    fn attach(&mut self, parent: NodeId, node: NodeId) {
        let row = self.sorted_row(parent, node);
        let parent_item = self.parent_handle_of(parent);
        self.observer.begin_insert_rows(parent_item, row, row);
        let inserted = self.tree.insert_child(parent, row, node);
        self.observer.end_insert_rows();
        if !inserted {
            log::error!("[NotebookCatalog] Failed to attach {:?} under {:?}", node, parent);
        }
    }

    /// Detach a node from its parent. Returns the old parent.
    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.tree.parent(node)?;
        let row = match self.tree.row_of_child(parent, node) {
            Some(row) => row,
            None => {
                log::error!("[NotebookCatalog] Can't find row of {:?} in its parent", node);
                return None;
            }
        };
        let parent_item = self.parent_handle_of(parent);
        self.observer.begin_remove_rows(parent_item, row, row);
        self.tree.remove_child(parent, row);
        self.observer.end_remove_rows();
        Some(parent)
    }

    /// Remove a node from its parent and its row, then re-insert it where it
    /// now sorts.
    fn reposition(&mut self, node: NodeId) {
        if let Some(parent) = self.detach(node) {
            self.attach(parent, node);
        }
    }

    pub(crate) fn ensure_all_notebooks_root(&mut self) -> NodeId {
        if let Some(node) = self.all_notebooks_root {
            return node;
        }
        let node = self.tree.create(NodeKind::AllNotebooksRoot);
        self.registry.get_or_allocate(&ItemKey::AllNotebooksRoot);
        self.all_notebooks_root = Some(node);
        let root = self.tree.invisible_root();
        self.attach(root, node);
        node
    }

    /// Find or create the root for a linked notebook. An unknown username is
    /// stored as empty until resolved.
    pub(crate) fn ensure_linked_root(&mut self, guid: &str) -> NodeId {
        if let Some(node) = self.linked_roots.get(guid) {
            return *node;
        }
        let all = self.ensure_all_notebooks_root();
        let node = self.tree.create(NodeKind::LinkedNotebookRoot {
            username: String::new(),
            guid: guid.to_string(),
        });
        self.registry
            .get_or_allocate(&ItemKey::LinkedNotebook(guid.to_string()));
        self.linked_roots.insert(guid.to_string(), node);
        self.attach(all, node);
        node
    }

    /// The node a notebook with these fields must hang under.
    fn parent_for(&mut self, record: &NotebookRecord) -> NodeId {
        let linked = record.linked_guid().map(str::to_string);
        match record.stack_name() {
            Some(stack) => {
                let stack = stack.to_string();
                self.find_or_create_stack(&stack, linked.as_deref())
            }
            None => match linked {
                Some(guid) => self.ensure_linked_root(&guid),
                None => self.ensure_all_notebooks_root(),
            },
        }
    }

    fn emit_data_changed(&mut self, node: NodeId) {
        if let Some(item) = self.handle_of(node) {
            self.observer.data_changed(item, Column::Name, Column::NoteCount);
        }
    }

    /// A stack shows the sum of its children's counts, so it follows them.
    fn emit_stack_count_changed(&mut self, node: NodeId) {
        if !matches!(self.tree.kind(node), Some(NodeKind::Stack { .. })) {
            return;
        }
        if let Some(item) = self.handle_of(node) {
            self.observer
                .data_changed(item, Column::NoteCount, Column::NoteCount);
        }
    }

    // ------------------------------------------------------------------
    // Record intake (listings, notifications, local edits)
    // ------------------------------------------------------------------

    /// Insert a new record or apply a changed one, moving its node when the
    /// name, stack or linked origin changed. Applying the same record twice
    /// leaves the tree as it was.
    pub fn upsert_notebook(&mut self, record: NotebookRecord) -> ItemId {
        let local_id = record.local_id.clone();
        match self.notebook_nodes.get(&local_id).copied() {
            Some(node) => {
                let structural = match self.store.get(&local_id) {
                    Some(old) => {
                        fold_name(&old.name) != fold_name(&record.name)
                            || old.stack_name() != record.stack_name()
                            || old.linked_guid() != record.linked_guid()
                    }
                    None => {
                        log::error!("[NotebookCatalog] Node without record for {}", local_id);
                        true
                    }
                };
                let old_count = self.store.get(&local_id).map(|r| r.note_count).unwrap_or(0);
                let new_count = record.note_count;
                self.store.insert(record.clone());
                if structural {
                    let old_parent = self.detach(node);
                    let new_parent = self.parent_for(&record);
                    self.attach(new_parent, node);
                    if let Some(old_parent) = old_parent {
                        if old_parent != new_parent && !self.remove_stack_if_empty(old_parent) && old_count > 0 {
                            self.emit_stack_count_changed(old_parent);
                        }
                    }
                    if new_count > 0 {
                        self.emit_stack_count_changed(new_parent);
                    }
                } else if old_count != new_count {
                    if let Some(parent) = self.tree.parent(node) {
                        self.emit_stack_count_changed(parent);
                    }
                }
                self.emit_data_changed(node);
                self.registry
                    .get_or_allocate(&ItemKey::Notebook(local_id))
            }
            None => {
                let item = self
                    .registry
                    .get_or_allocate(&ItemKey::Notebook(local_id.clone()));
                self.store.insert(record.clone());
                let node = self.tree.create(NodeKind::Notebook {
                    local_id: local_id.clone(),
                });
                self.notebook_nodes.insert(local_id, node);
                let parent = self.parent_for(&record);
                self.attach(parent, node);
                if record.note_count > 0 {
                    self.emit_stack_count_changed(parent);
                }
                item
            }
        }
    }

    /// Remove a notebook and its node; an emptied stack goes with it.
    pub fn remove_notebook(&mut self, local_id: &str) -> Option<NotebookRecord> {
        let node = self.notebook_nodes.remove(local_id)?;
        let parent = self.detach(node);
        self.tree.destroy(node);
        self.registry
            .forget(&ItemKey::Notebook(local_id.to_string()));
        let record = self.store.remove(local_id);
        if record.is_none() {
            log::error!("[NotebookCatalog] Removed node {} had no record", local_id);
        }
        if let Some(parent) = parent {
            let counted = record.as_ref().is_some_and(|r| r.note_count > 0);
            if !self.remove_stack_if_empty(parent) && counted {
                self.emit_stack_count_changed(parent);
            }
        }
        record
    }

    pub fn upsert_linked_notebook(&mut self, linked: &LinkedNotebook) -> ItemId {
        let node = self.ensure_linked_root(&linked.guid);
        let changed = match self.tree.kind_mut(node) {
            Some(NodeKind::LinkedNotebookRoot { username, .. }) if *username != linked.username => {
                *username = linked.username.clone();
                true
            }
            _ => false,
        };
        if changed {
            self.reposition(node);
            self.emit_data_changed(node);
        }
        self.registry
            .get_or_allocate(&ItemKey::LinkedNotebook(linked.guid.clone()))
    }

    /// Remove a linked notebook root together with every notebook of that
    /// origin.
    pub fn remove_linked_notebook(&mut self, guid: &str) -> Vec<NotebookRecord> {
        let ids: Vec<String> = self
            .store
            .linked_members(guid)
            .iter()
            .map(|r| r.local_id.clone())
            .collect();
        let removed: Vec<NotebookRecord> = ids
            .iter()
            .filter_map(|id| self.remove_notebook(id))
            .collect();
        if let Some(node) = self.linked_roots.remove(guid) {
            self.detach(node);
            let leftovers = self.tree.children(node).to_vec();
            for child in leftovers {
                log::error!("[NotebookCatalog] Linked root {} still had child {:?}", guid, child);
                self.tree.remove_child(node, 0);
            }
            self.tree.destroy(node);
            self.registry
                .forget(&ItemKey::LinkedNotebook(guid.to_string()));
        }
        removed
    }

    pub fn set_note_count(&mut self, local_id: &str, count: u32) -> bool {
        let Some(node) = self.notebook_nodes.get(local_id).copied() else {
            return false;
        };
        match self.store.get(local_id) {
            Some(record) if record.note_count != count => {}
            _ => return false,
        }
        self.store.update(local_id, |r| r.note_count = count);
        if let Some(item) = self.handle_of(node) {
            self.observer
                .data_changed(item, Column::NoteCount, Column::NoteCount);
        }
        if let Some(parent) = self.tree.parent(node) {
            self.emit_stack_count_changed(parent);
        }
        true
    }

    // ------------------------------------------------------------------
    // Validated local edits; each returns the records that must be put
    // ------------------------------------------------------------------

    fn editable_record(&self, local_id: &str) -> Result<&NotebookRecord> {
        let record = self.store.get(local_id).ok_or(CatalogError::ItemNotFound)?;
        if !record.flags.updatable {
            return Err(CatalogError::Restricted(
                record.name.clone(),
                "the notebook is not updatable".to_string(),
            ));
        }
        Ok(record)
    }

    fn check_unique_name(&self, name: &str, linked: Option<&str>, except: Option<&str>) -> Result<()> {
        match self.store.find_by_name(name, linked) {
            Some(existing) if Some(existing.local_id.as_str()) != except => {
                Err(CatalogError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn validate_new_notebook(&self, name: &str, stack: Option<&str>) -> Result<()> {
        validate_notebook_name(name)?;
        if let Some(stack) = stack.filter(|s| !s.is_empty()) {
            validate_stack_name(stack)?;
        }
        self.check_unique_name(name, None, None)
    }

    pub fn rename_notebook(&mut self, local_id: &str, new_name: &str) -> Result<Option<NotebookRecord>> {
        let record = self.editable_record(local_id)?;
        if !record.flags.name_updatable {
            return Err(CatalogError::Restricted(
                record.name.clone(),
                "the name can't be changed".to_string(),
            ));
        }
        if record.name == new_name {
            return Ok(None);
        }
        validate_notebook_name(new_name)?;
        let linked = record.linked_guid().map(str::to_string);
        self.check_unique_name(new_name, linked.as_deref(), Some(local_id))?;

        let mut updated = record.clone();
        updated.name = new_name.to_string();
        updated.flags.dirty = true;
        self.upsert_notebook(updated.clone());
        Ok(Some(updated))
    }

    pub fn set_stack(&mut self, local_id: &str, stack: Option<&str>) -> Result<Option<NotebookRecord>> {
        let record = self.editable_record(local_id)?;
        if record.is_linked() {
            return Err(CatalogError::FromLinkedNotebook(record.name.clone()));
        }
        let stack = stack.filter(|s| !s.is_empty());
        if record.stack_name() == stack {
            return Ok(None);
        }
        if let Some(stack) = stack {
            validate_stack_name(stack)?;
        }
        let mut updated = record.clone();
        updated.stack = stack.map(str::to_string);
        updated.flags.dirty = true;
        self.upsert_notebook(updated.clone());
        Ok(Some(updated))
    }

    /// Change one of the boolean columns. Default and last-used are exclusive,
    /// so the previous holder comes back too.
    pub fn set_flag(&mut self, local_id: &str, column: Column, value: bool) -> Result<Vec<NotebookRecord>> {
        let record = self.editable_record(local_id)?;
        let current = match column {
            Column::Synchronizable => record.flags.synchronizable,
            Column::Default => record.flags.default,
            Column::LastUsed => record.flags.last_used,
            Column::Favorited => record.flags.favorited,
            other => return Err(CatalogError::NotEditable(other)),
        };
        if current == value {
            return Ok(Vec::new());
        }
        match column {
            Column::Synchronizable if record.is_linked() => {
                return Err(CatalogError::FromLinkedNotebook(record.name.clone()));
            }
            Column::Synchronizable if !value && record.is_synchronized() => {
                return Err(CatalogError::Restricted(
                    record.name.clone(),
                    "an already synchronized notebook can't be made local".to_string(),
                ));
            }
            Column::Default | Column::LastUsed if record.is_linked() => {
                return Err(CatalogError::FromLinkedNotebook(record.name.clone()));
            }
            Column::Default if !value => {
                return Err(CatalogError::Restricted(
                    record.name.clone(),
                    "make another notebook the default one instead".to_string(),
                ));
            }
            _ => {}
        }

        let mut changed = Vec::new();
        if value && matches!(column, Column::Default | Column::LastUsed) {
            let previous: Vec<String> = self
                .store
                .iter_by_name()
                .filter(|r| r.local_id != local_id)
                .filter(|r| match column {
                    Column::Default => r.flags.default,
                    _ => r.flags.last_used,
                })
                .map(|r| r.local_id.clone())
                .collect();
            for id in previous {
                if let Some(mut other) = self.store.get(&id).cloned() {
                    match column {
                        Column::Default => other.flags.default = false,
                        _ => other.flags.last_used = false,
                    }
                    other.flags.dirty = true;
                    self.upsert_notebook(other.clone());
                    changed.push(other);
                }
            }
        }

        let mut updated = match self.store.get(local_id) {
            Some(r) => r.clone(),
            None => return Err(CatalogError::Internal(format!("record {} vanished", local_id))),
        };
        match column {
            Column::Synchronizable => updated.flags.synchronizable = value,
            Column::Default => updated.flags.default = value,
            Column::LastUsed => updated.flags.last_used = value,
            _ => updated.flags.favorited = value,
        }
        updated.flags.dirty = true;
        self.upsert_notebook(updated.clone());
        changed.push(updated);
        Ok(changed)
    }

    /// Synchronous delete checks: synchronized and linked notebooks stay.
    pub fn check_removable(&self, local_id: &str) -> Result<()> {
        let record = self.store.get(local_id).ok_or(CatalogError::ItemNotFound)?;
        if record.is_synchronized() {
            return Err(CatalogError::AlreadySynchronized(record.name.clone()));
        }
        if record.is_linked() {
            return Err(CatalogError::FromLinkedNotebook(record.name.clone()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Only sorting by name is honored. Flipping the order reverses siblings
    /// within each tie-break group instead of re-sorting.
    pub fn sort(&mut self, column: Column, order: SortOrder) -> SortChange {
        let change = self.sorting.request(column, order);
        if change != SortChange::Reversed {
            return change;
        }
        self.observer.layout_about_to_change();
        let parents = self.tree.descendants(self.tree.invisible_root());
        for parent in parents {
            let children = self.tree.children(parent).to_vec();
            if children.len() < 2 {
                continue;
            }
            let entries: Vec<(NodeId, SortKey)> = children
                .into_iter()
                .map(|c| (c, self.sort_key(c)))
                .collect();
            let reversed = SortingPolicy::reversed_within_groups(entries);
            self.tree.reorder_children(parent, reversed);
        }
        self.observer.layout_changed();
        change
    }

    /// Full stable re-sort of every sibling list.
    pub fn resort(&mut self) {
        self.observer.layout_about_to_change();
        let parents = self.tree.descendants(self.tree.invisible_root());
        for parent in parents {
            let entries: Vec<(NodeId, SortKey)> = self
                .tree
                .children(parent)
                .iter()
                .map(|c| (*c, self.sort_key(*c)))
                .collect();
            if entries.len() < 2 {
                continue;
            }
            let order = self.sorting.sorted(entries);
            self.tree.reorder_children(parent, order);
        }
        self.observer.layout_changed();
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    fn label_of(&self, node: NodeId) -> String {
        match self.tree.kind(node) {
            Some(NodeKind::InvisibleRoot) => "(root)".to_string(),
            Some(NodeKind::AllNotebooksRoot) => self.all_notebooks_label.clone(),
            Some(NodeKind::LinkedNotebookRoot { username, guid }) => {
                if username.is_empty() {
                    format!("linked:{}", guid)
                } else {
                    format!("linked:{}", username)
                }
            }
            Some(NodeKind::Stack { name, .. }) => format!("stack:{}", name),
            Some(NodeKind::Notebook { local_id }) => match self.store.get(local_id) {
                Some(r) => format!("notebook:{}", r.name),
                None => format!("notebook:<missing {}>", local_id),
            },
            None => "<gone>".to_string(),
        }
    }

    fn snapshot_node(&self, node: NodeId) -> CatalogSnapshot {
        CatalogSnapshot {
            item: self.parent_handle_of(node),
            label: self.label_of(node),
            children: self
                .tree
                .children(node)
                .iter()
                .map(|c| self.snapshot_node(*c))
                .collect(),
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot_node(self.tree.invisible_root())
    }

    /// Indented outline of the visible tree, one item per line.
    pub fn outline(&self) -> String {
        fn walk(snapshot: &CatalogSnapshot, depth: usize, out: &mut String) {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&snapshot.label);
            out.push('\n');
            for child in &snapshot.children {
                walk(child, depth + 1, out);
            }
        }
        let mut out = String::new();
        for child in &self.snapshot().children {
            walk(child, 0, &mut out);
        }
        out
    }

    fn column_value(&self, node: NodeId, column: Column) -> Option<CellValue> {
        match self.tree.kind(node)? {
            NodeKind::InvisibleRoot => None,
            NodeKind::AllNotebooksRoot => match column {
                Column::Name => Some(CellValue::Text(self.all_notebooks_label.clone())),
                _ => None,
            },
            NodeKind::LinkedNotebookRoot { username, guid } => match column {
                Column::Name if username.is_empty() => Some(CellValue::Text(guid.clone())),
                Column::Name => Some(CellValue::Text(username.clone())),
                Column::FromLinkedNotebook => Some(CellValue::Bool(true)),
                _ => None,
            },
            NodeKind::Stack { name, .. } => match column {
                Column::Name => Some(CellValue::Text(name.clone())),
                Column::NoteCount => {
                    let total: u32 = self
                        .tree
                        .children(node)
                        .iter()
                        .filter_map(|c| match self.tree.kind(*c) {
                            Some(NodeKind::Notebook { local_id }) => self.store.get(local_id),
                            _ => None,
                        })
                        .map(|r| r.note_count)
                        .sum();
                    Some(CellValue::Count(total))
                }
                _ => None,
            },
            NodeKind::Notebook { local_id } => {
                let record = self.store.get(local_id)?;
                let flags = &record.flags;
                Some(match column {
                    Column::Name => CellValue::Text(record.name.clone()),
                    Column::Synchronizable => CellValue::Bool(flags.synchronizable),
                    Column::Dirty => CellValue::Bool(flags.dirty),
                    Column::Default => CellValue::Bool(flags.default),
                    Column::LastUsed => CellValue::Bool(flags.last_used),
                    Column::Published => CellValue::Bool(flags.published),
                    Column::Favorited => CellValue::Bool(flags.favorited),
                    Column::FromLinkedNotebook => CellValue::Bool(record.is_linked()),
                    Column::NoteCount => CellValue::Count(record.note_count),
                })
            }
        }
    }
}

fn column_title(column: Column) -> &'static str {
    match column {
        Column::Name => "Name",
        Column::Synchronizable => "Synchronizable",
        Column::Dirty => "Changed",
        Column::Default => "Default",
        Column::LastUsed => "Last used",
        Column::Published => "Published",
        Column::Favorited => "Favorited",
        Column::FromLinkedNotebook => "From linked notebook",
        Column::NoteCount => "Notes per notebook",
    }
}

impl TreeAccessor for NotebookCatalog {
    fn row_count(&self, parent: Option<ItemId>) -> usize {
        self.parent_node_of(parent)
            .map(|node| self.tree.children(node).len())
            .unwrap_or(0)
    }

    fn child_handle(&self, parent: Option<ItemId>, row: usize) -> Option<ItemId> {
        let node = self.parent_node_of(parent)?;
        let child = self.tree.child_at(node, row)?;
        self.handle_of(child)
    }

    fn parent_handle(&self, item: ItemId) -> Option<ItemId> {
        let node = self.node_of(item)?;
        let parent = self.tree.parent(node)?;
        self.parent_handle_of(parent)
    }

    fn row_of(&self, item: ItemId) -> Option<usize> {
        self.tree.row(self.node_of(item)?)
    }

    fn data(&self, item: ItemId, column: Column, role: Role) -> Option<CellValue> {
        let node = self.node_of(item)?;
        let value = self.column_value(node, column)?;
        match role {
            Role::Display | Role::Edit | Role::ToolTip => Some(value),
            Role::AccessibleText => {
                let text = match value {
                    CellValue::Text(t) => t,
                    CellValue::Bool(true) => "yes".to_string(),
                    CellValue::Bool(false) => "no".to_string(),
                    CellValue::Count(n) => n.to_string(),
                };
                Some(CellValue::Text(format!("{}: {}", column_title(column), text)))
            }
        }
    }

    fn flags(&self, item: ItemId, column: Column) -> ItemFlags {
        let Some(kind) = self.node_of(item).and_then(|n| self.tree.kind(n)) else {
            return ItemFlags::default();
        };
        match kind {
            NodeKind::InvisibleRoot => ItemFlags::default(),
            NodeKind::AllNotebooksRoot => ItemFlags {
                selectable: true,
                drop_enabled: true,
                ..Default::default()
            },
            NodeKind::LinkedNotebookRoot { .. } => ItemFlags {
                selectable: true,
                ..Default::default()
            },
            NodeKind::Stack { linked_notebook_guid, .. } => ItemFlags {
                selectable: true,
                editable: column == Column::Name && linked_notebook_guid.is_none(),
                drop_enabled: linked_notebook_guid.is_none(),
                ..Default::default()
            },
            NodeKind::Notebook { local_id } => {
                let Some(record) = self.store.get(local_id) else {
                    return ItemFlags::default();
                };
                let updatable = record.flags.updatable;
                let editable = match column {
                    Column::Name => updatable && record.flags.name_updatable,
                    Column::Synchronizable => updatable && !record.is_linked() && !record.is_synchronized(),
                    Column::Default | Column::LastUsed => updatable && !record.is_linked(),
                    Column::Favorited => updatable,
                    _ => false,
                };
                ItemFlags {
                    selectable: true,
                    editable,
                    drag_enabled: updatable && !record.is_linked(),
                    drop_enabled: false,
                }
            }
        }
    }
}
