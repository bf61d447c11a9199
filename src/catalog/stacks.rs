//! Stack nodes exist only while at least one notebook names them.

use crate::catalog::identity::ItemKey;
use crate::catalog::tree::{NodeId, NodeKind};
use crate::catalog::NotebookCatalog;
use crate::error::{CatalogError, Result};
use crate::notebook::validation::validate_stack_name;
use crate::notebook::NotebookRecord;

impl NotebookCatalog {
    pub(crate) fn find_or_create_stack(&mut self, name: &str, linked_notebook_guid: Option<&str>) -> NodeId {
        let key = (name.to_string(), linked_notebook_guid.map(str::to_string));
        if let Some(node) = self.stack_nodes.get(&key) {
            return *node;
        }
        let parent = match linked_notebook_guid {
            Some(guid) => self.ensure_linked_root(guid),
            None => self.ensure_all_notebooks_root(),
        };
        let node = self.tree.create(NodeKind::Stack {
            name: key.0.clone(),
            linked_notebook_guid: key.1.clone(),
        });
        self.registry.get_or_allocate(&ItemKey::Stack {
            name: key.0.clone(),
            linked_notebook_guid: key.1.clone(),
        });
        self.stack_nodes.insert(key, node);
        self.attach(parent, node);
        log::debug!("[NotebookCatalog] Created stack '{}'", name);
        node
    }

    /// Drop `node` if it is a stack with no children left. Other kinds are
    /// left alone.
    pub(crate) fn remove_stack_if_empty(&mut self, node: NodeId) -> bool {
        let key = match self.tree.kind(node) {
            Some(NodeKind::Stack { name, linked_notebook_guid }) if self.tree.children(node).is_empty() => {
                (name.clone(), linked_notebook_guid.clone())
            }
            _ => return false,
        };
        self.detach(node);
        self.tree.destroy(node);
        self.registry.forget(&ItemKey::Stack {
            name: key.0.clone(),
            linked_notebook_guid: key.1.clone(),
        });
        log::debug!("[NotebookCatalog] Removed empty stack '{}'", key.0);
        self.stack_nodes.remove(&key);
        true
    }

    fn own_stack_members(&self, stack: &str) -> Result<Vec<String>> {
        let key = (stack.to_string(), None);
        if !self.stack_nodes.contains_key(&key) {
            return Err(CatalogError::ItemNotFound);
        }
        let members = self.store.stack_members(stack, None);
        if let Some(locked) = members.iter().find(|r| !r.flags.updatable) {
            return Err(CatalogError::Restricted(
                locked.name.clone(),
                format!("stack '{}' contains a notebook that can't be updated", stack),
            ));
        }
        Ok(members.iter().map(|r| r.local_id.clone()).collect())
    }

    /// Rename a stack of the user's own notebooks. Renaming onto an existing
    /// stack merges the two. Returns every record that changed.
    pub fn rename_stack(&mut self, old: &str, new: &str) -> Result<Vec<NotebookRecord>> {
        if old == new {
            return Ok(Vec::new());
        }
        validate_stack_name(new)?;
        let ids = self.own_stack_members(old)?;
        let mut changed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.set_stack(&id, Some(new))? {
                changed.push(record);
            }
        }
        Ok(changed)
    }

    /// Dissolve a stack: its notebooks move up to the all-notebooks item.
    pub fn dissolve_stack(&mut self, stack: &str) -> Result<Vec<NotebookRecord>> {
        let ids = self.own_stack_members(stack)?;
        let mut changed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.set_stack(&id, None)? {
                changed.push(record);
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::NotebookCatalog;
    use crate::error::CatalogError;
    use crate::notebook::NotebookRecord;
    use crate::view::{Column, Role, TreeAccessor};

    fn add(catalog: &mut NotebookCatalog, name: &str, stack: Option<&str>) -> String {
        let record = NotebookRecord::new_local(name, stack);
        let id = record.local_id.clone();
        catalog.upsert_notebook(record);
        id
    }

    #[test]
    fn test_stack_created_and_removed_with_members() {
        let mut catalog = NotebookCatalog::default();
        let a = add(&mut catalog, "A", Some("S"));
        let b = add(&mut catalog, "B", Some("S"));
        let stack = catalog.item_for_stack("S", None).unwrap();
        assert_eq!(catalog.row_count(Some(stack)), 2);

        catalog.remove_notebook(&a);
        assert_eq!(catalog.item_for_stack("S", None), Some(stack));
        catalog.remove_notebook(&b);
        assert_eq!(catalog.item_for_stack("S", None), None);
        assert!(catalog.data(stack, Column::Name, Role::Display).is_none(), "stale handle");
    }

    #[test]
    fn test_rename_stack_merges_into_existing() {
        let mut catalog = NotebookCatalog::default();
        add(&mut catalog, "A", Some("Old"));
        add(&mut catalog, "B", Some("New"));

        let changed = catalog.rename_stack("Old", "New").unwrap();
        assert_eq!(changed.len(), 1);
        assert!(changed[0].flags.dirty);
        assert_eq!(catalog.item_for_stack("Old", None), None);
        let merged = catalog.item_for_stack("New", None).unwrap();
        assert_eq!(catalog.row_count(Some(merged)), 2);
    }

    #[test]
    fn test_dissolve_moves_members_up() {
        let mut catalog = NotebookCatalog::default();
        let a = add(&mut catalog, "A", Some("S"));
        let changed = catalog.dissolve_stack("S").unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(catalog.item_for_stack("S", None), None);
        let item = catalog.item_for_notebook(&a).unwrap();
        assert_eq!(catalog.parent_handle(item), catalog.all_notebooks_item());
        assert_eq!(catalog.record(&a).unwrap().stack, None);
    }

    #[test]
    fn test_unknown_stack_and_bad_names() {
        let mut catalog = NotebookCatalog::default();
        add(&mut catalog, "A", Some("S"));
        assert_eq!(catalog.rename_stack("Nope", "X"), Err(CatalogError::ItemNotFound));
        assert!(matches!(catalog.rename_stack("S", " padded"), Err(CatalogError::InvalidName(_))));
        assert_eq!(catalog.rename_stack("S", "S").unwrap(), Vec::new());
    }

    #[test]
    fn test_stack_names_are_case_sensitive() {
        let mut catalog = NotebookCatalog::default();
        add(&mut catalog, "A", Some("work"));
        add(&mut catalog, "B", Some("Work"));
        assert!(catalog.item_for_stack("work", None).is_some());
        assert!(catalog.item_for_stack("Work", None).is_some());
        assert_ne!(catalog.item_for_stack("work", None), catalog.item_for_stack("Work", None));
    }
}
