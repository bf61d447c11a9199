use std::collections::{BTreeSet, HashMap};

use crate::notebook::validation::fold_name;
use crate::notebook::NotebookRecord;

/// (folded name, scope, local id). Keeping the id in the key tolerates
/// duplicate names arriving from storage.
type NameKey = (String, String, String);

/// (scope, stack name)
type StackKey = (String, String);

/// In-memory table of notebook records with secondary indexes by name,
/// stack and linked-notebook origin.
#[derive(Default)]
pub struct EntityStore {
    by_id: HashMap<String, NotebookRecord>,
    by_name: BTreeSet<NameKey>,
    by_stack: HashMap<StackKey, BTreeSet<String>>,
    by_scope: HashMap<String, BTreeSet<String>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&NotebookRecord> {
        self.by_id.get(id)
    }

    /// Insert or replace; returns the previous record for the same id.
    pub fn insert(&mut self, record: NotebookRecord) -> Option<NotebookRecord> {
        let previous = self.remove(&record.local_id);
        self.index(&record);
        self.by_id.insert(record.local_id.clone(), record);
        previous
    }

    /// Mutate a record in place, keeping the indexes in sync. The id is
    /// restored if the closure touched it.
    pub fn update<F>(&mut self, id: &str, f: F) -> Option<&NotebookRecord>
    where
        F: FnOnce(&mut NotebookRecord),
    {
        let mut record = self.remove(id)?;
        f(&mut record);
        if record.local_id != id {
            log::error!("[EntityStore] Update tried to change id {} -> {}", id, record.local_id);
            record.local_id = id.to_string();
        }
        self.index(&record);
        self.by_id.insert(id.to_string(), record);
        self.by_id.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<NotebookRecord> {
        let record = self.by_id.remove(id)?;
        self.unindex(&record);
        Some(record)
    }

    /// Case-insensitive lookup within one linked-notebook scope (`None` is
    /// the user's own account).
    pub fn find_by_name(&self, name: &str, linked_notebook_guid: Option<&str>) -> Option<&NotebookRecord> {
        let folded = fold_name(name);
        let scope = linked_notebook_guid.unwrap_or("").to_string();
        let start = (folded.clone(), scope.clone(), String::new());
        self.by_name
            .range(start..)
            .take_while(|(n, s, _)| *n == folded && *s == scope)
            .find_map(|(_, _, id)| self.by_id.get(id))
    }

    pub fn iter_by_name(&self) -> impl Iterator<Item = &NotebookRecord> {
        self.by_name.iter().filter_map(move |(_, _, id)| self.by_id.get(id))
    }

    pub fn stack_members(&self, stack: &str, linked_notebook_guid: Option<&str>) -> Vec<&NotebookRecord> {
        let key = (linked_notebook_guid.unwrap_or("").to_string(), stack.to_string());
        self.by_stack
            .get(&key)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn linked_members(&self, linked_notebook_guid: &str) -> Vec<&NotebookRecord> {
        self.by_scope
            .get(linked_notebook_guid)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Distinct stack names within one scope, sorted.
    pub fn stacks(&self, linked_notebook_guid: Option<&str>) -> Vec<String> {
        let scope = linked_notebook_guid.unwrap_or("");
        let mut names: Vec<String> = self
            .by_stack
            .keys()
            .filter(|(s, _)| s == scope)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn index(&mut self, record: &NotebookRecord) {
        let scope = record.scope().to_string();
        self.by_name
            .insert((fold_name(&record.name), scope.clone(), record.local_id.clone()));
        if let Some(stack) = record.stack_name() {
            self.by_stack
                .entry((scope.clone(), stack.to_string()))
                .or_default()
                .insert(record.local_id.clone());
        }
        self.by_scope
            .entry(scope)
            .or_default()
            .insert(record.local_id.clone());
    }

    fn unindex(&mut self, record: &NotebookRecord) {
        let scope = record.scope().to_string();
        self.by_name
            .remove(&(fold_name(&record.name), scope.clone(), record.local_id.clone()));
        if let Some(stack) = record.stack_name() {
            let key = (scope.clone(), stack.to_string());
            if let Some(ids) = self.by_stack.get_mut(&key) {
                ids.remove(&record.local_id);
                if ids.is_empty() {
                    self.by_stack.remove(&key);
                }
            }
        }
        if let Some(ids) = self.by_scope.get_mut(&scope) {
            ids.remove(&record.local_id);
            if ids.is_empty() {
                self.by_scope.remove(&scope);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, stack: Option<&str>, linked: Option<&str>) -> NotebookRecord {
        let mut r = NotebookRecord::new_local(name, stack);
        r.local_id = id.to_string();
        r.linked_notebook_guid = linked.map(str::to_string);
        r
    }

    #[test]
    fn test_find_by_name_is_case_insensitive_and_scoped() {
        let mut store = EntityStore::new();
        store.insert(record("1", "Work", None, None));
        store.insert(record("2", "work", None, Some("ln")));

        assert_eq!(store.find_by_name("WORK", None).map(|r| r.local_id.as_str()), Some("1"));
        assert_eq!(store.find_by_name("wOrK", Some("ln")).map(|r| r.local_id.as_str()), Some("2"));
        assert!(store.find_by_name("Work", Some("other")).is_none());
        assert!(store.find_by_name("Wor", None).is_none());
    }

    #[test]
    fn test_replace_keeps_id_and_reindexes() {
        let mut store = EntityStore::new();
        store.insert(record("1", "Old", Some("S"), None));
        let previous = store.insert(record("1", "New", None, None));

        assert_eq!(previous.map(|r| r.name), Some("Old".to_string()));
        assert_eq!(store.len(), 1);
        assert!(store.find_by_name("Old", None).is_none());
        assert!(store.find_by_name("New", None).is_some());
        assert!(store.stack_members("S", None).is_empty());
        assert!(store.stacks(None).is_empty());
    }

    #[test]
    fn test_update_cannot_change_id() {
        let mut store = EntityStore::new();
        store.insert(record("1", "A", None, None));
        store.update("1", |r| {
            r.local_id = "hijacked".to_string();
            r.name = "B".to_string();
        });
        assert!(store.get("hijacked").is_none());
        assert_eq!(store.get("1").map(|r| r.name.as_str()), Some("B"));
        assert!(store.find_by_name("B", None).is_some());
    }

    #[test]
    fn test_iter_by_name_order() {
        let mut store = EntityStore::new();
        store.insert(record("1", "charlie", None, None));
        store.insert(record("2", "Alpha", None, None));
        store.insert(record("3", "bravo", None, None));
        let names: Vec<&str> = store.iter_by_name().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_stack_and_scope_indexes() {
        let mut store = EntityStore::new();
        store.insert(record("1", "A", Some("Projects"), None));
        store.insert(record("2", "B", Some("Projects"), None));
        store.insert(record("3", "C", Some("Projects"), Some("ln")));
        store.insert(record("4", "D", Some("Archive"), None));

        assert_eq!(store.stack_members("Projects", None).len(), 2);
        assert_eq!(store.stack_members("Projects", Some("ln")).len(), 1);
        assert_eq!(store.stacks(None), vec!["Archive".to_string(), "Projects".to_string()]);
        assert_eq!(store.linked_members("ln").len(), 1);

        store.remove("3");
        assert!(store.linked_members("ln").is_empty());
        assert!(store.stacks(Some("ln")).is_empty());
    }

    #[test]
    fn test_duplicate_names_from_storage_are_tolerated() {
        let mut store = EntityStore::new();
        store.insert(record("1", "Same", None, None));
        store.insert(record("2", "same", None, None));
        assert_eq!(store.len(), 2);
        store.remove("1");
        assert_eq!(store.find_by_name("SAME", None).map(|r| r.local_id.as_str()), Some("2"));
    }
}
