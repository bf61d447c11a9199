use std::collections::HashMap;

use crate::view::ItemId;

/// Well-known handle of the "all notebooks" item.
pub const ALL_NOTEBOOKS_ROOT_ID: ItemId = ItemId(1);

/// Domain key an [`ItemId`] stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    AllNotebooksRoot,
    Notebook(String),
    Stack {
        name: String,
        linked_notebook_guid: Option<String>,
    },
    LinkedNotebook(String),
}

/// Bidirectional mapping between domain keys and opaque item ids.
///
/// Ids are handed out monotonically and never recycled, so a view holding a
/// handle to a removed item gets "not found" instead of a different item.
pub struct IdentityRegistry {
    next: u64,
    notebooks: HashMap<String, ItemId>,
    stacks: HashMap<(String, Option<String>), ItemId>,
    linked: HashMap<String, ItemId>,
    reverse: HashMap<ItemId, ItemKey>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            next: ALL_NOTEBOOKS_ROOT_ID.0 + 1,
            notebooks: HashMap::new(),
            stacks: HashMap::new(),
            linked: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    pub fn lookup(&self, key: &ItemKey) -> Option<ItemId> {
        match key {
            ItemKey::AllNotebooksRoot => Some(ALL_NOTEBOOKS_ROOT_ID),
            ItemKey::Notebook(id) => self.notebooks.get(id).copied(),
            ItemKey::Stack { name, linked_notebook_guid } => self
                .stacks
                .get(&(name.clone(), linked_notebook_guid.clone()))
                .copied(),
            ItemKey::LinkedNotebook(guid) => self.linked.get(guid).copied(),
        }
    }

    pub fn get_or_allocate(&mut self, key: &ItemKey) -> ItemId {
        if let Some(id) = self.lookup(key) {
            return id;
        }
        let id = ItemId(self.next);
        self.next += 1;
        match key {
            ItemKey::AllNotebooksRoot => return ALL_NOTEBOOKS_ROOT_ID,
            ItemKey::Notebook(local_id) => {
                self.notebooks.insert(local_id.clone(), id);
            }
            ItemKey::Stack { name, linked_notebook_guid } => {
                self.stacks
                    .insert((name.clone(), linked_notebook_guid.clone()), id);
            }
            ItemKey::LinkedNotebook(guid) => {
                self.linked.insert(guid.clone(), id);
            }
        }
        self.reverse.insert(id, key.clone());
        id
    }

    pub fn resolve(&self, id: ItemId) -> Option<ItemKey> {
        if id == ALL_NOTEBOOKS_ROOT_ID {
            return Some(ItemKey::AllNotebooksRoot);
        }
        self.reverse.get(&id).cloned()
    }

    /// Drop the mapping for a removed key. The id itself is retired.
    pub fn forget(&mut self, key: &ItemKey) {
        let removed = match key {
            ItemKey::AllNotebooksRoot => None,
            ItemKey::Notebook(local_id) => self.notebooks.remove(local_id),
            ItemKey::Stack { name, linked_notebook_guid } => self
                .stacks
                .remove(&(name.clone(), linked_notebook_guid.clone())),
            ItemKey::LinkedNotebook(guid) => self.linked.remove(guid),
        };
        if let Some(id) = removed {
            self.reverse.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_stable() {
        let mut registry = IdentityRegistry::new();
        let key = ItemKey::Notebook("nb-1".to_string());
        let a = registry.get_or_allocate(&key);
        let b = registry.get_or_allocate(&key);
        assert_eq!(a, b);
        assert_eq!(registry.resolve(a), Some(key));
    }

    #[test]
    fn test_starts_above_reserved_root() {
        let mut registry = IdentityRegistry::new();
        let first = registry.get_or_allocate(&ItemKey::LinkedNotebook("ln".to_string()));
        assert!(first > ALL_NOTEBOOKS_ROOT_ID);
        assert_eq!(registry.get_or_allocate(&ItemKey::AllNotebooksRoot), ALL_NOTEBOOKS_ROOT_ID);
        assert_eq!(registry.resolve(ALL_NOTEBOOKS_ROOT_ID), Some(ItemKey::AllNotebooksRoot));
    }

    #[test]
    fn test_key_kinds_do_not_collide() {
        let mut registry = IdentityRegistry::new();
        let notebook = registry.get_or_allocate(&ItemKey::Notebook("x".to_string()));
        let linked = registry.get_or_allocate(&ItemKey::LinkedNotebook("x".to_string()));
        let stack = registry.get_or_allocate(&ItemKey::Stack {
            name: "x".to_string(),
            linked_notebook_guid: None,
        });
        let linked_stack = registry.get_or_allocate(&ItemKey::Stack {
            name: "x".to_string(),
            linked_notebook_guid: Some("x".to_string()),
        });
        let mut all = vec![notebook, linked, stack, linked_stack];
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_ids_never_recycled() {
        let mut registry = IdentityRegistry::new();
        let key = ItemKey::Notebook("gone".to_string());
        let old = registry.get_or_allocate(&key);
        registry.forget(&key);

        assert_eq!(registry.resolve(old), None);
        let replacement = registry.get_or_allocate(&ItemKey::Notebook("new".to_string()));
        assert_ne!(replacement, old);
        let again = registry.get_or_allocate(&key);
        assert_ne!(again, old, "a re-added key gets a fresh id");
    }
}
